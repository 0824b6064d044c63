//! Round-trip helpers shared by the format test modules

use crate::BinaryFormat;
use std::fmt::Debug;

/// Build a value, parse it back and compare
pub fn test_round_trip<T>(original: &T) -> Result<(), Box<dyn std::error::Error>>
where
    T: BinaryFormat + PartialEq + Debug,
{
    let data = original.build()?;
    let parsed = T::parse(&data)?;

    if original != &parsed {
        return Err(format!(
            "Round-trip verification failed:\nOriginal: {:?}\nParsed: {:?}",
            original, parsed
        )
        .into());
    }

    // Rebuilding the parsed value must reproduce the same bytes
    T::verify_round_trip(&data)
}
