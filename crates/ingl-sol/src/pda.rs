//! Program Derived Address (PDA) derivation.
//!
//! A PDA is `SHA-256(seed_0 || ... || seed_n || bump || program_id || "ProgramDerivedAddress")`
//! for the largest bump in `255..=0` whose hash is NOT a valid Ed25519 point,
//! so no private key can ever sign for it. The on-chain runtime runs the same
//! search; both sides must land on the same address independently.

use sha2::{Digest, Sha256};

use crate::address::Address;
use crate::error::SolError;

/// Longest permitted single seed, in bytes.
pub const MAX_SEED_LEN: usize = 32;
/// Most seeds a derivation may use, bump included.
pub const MAX_SEEDS: usize = 16;

/// The string appended to PDA derivation: "ProgramDerivedAddress".
const PDA_MARKER: &[u8] = b"ProgramDerivedAddress";

/// Find the canonical PDA for `seeds` under `program_id`.
///
/// Iterates bump seeds from 255 down to 0 and returns the first off-curve
/// result together with its bump. Failing every bump means the seeds are
/// misdesigned, which is reported as [`SolError::NoValidAddressFound`].
pub fn find_program_address(
    seeds: &[&[u8]],
    program_id: &Address,
) -> Result<(Address, u8), SolError> {
    if seeds.len() >= MAX_SEEDS {
        return Err(SolError::InvalidSeeds(format!(
            "{} seeds leaves no room for the bump (max {})",
            seeds.len(),
            MAX_SEEDS - 1
        )));
    }
    check_seed_lengths(seeds)?;

    for bump in (0u8..=255).rev() {
        if let Some(address) = hash_off_curve(seeds, &[bump], program_id) {
            tracing::trace!(%address, bump, "derived program address");
            return Ok((address, bump));
        }
    }

    Err(SolError::NoValidAddressFound)
}

/// Derive the address for an exact seed list (bump already included).
///
/// Fails if the result lands on the curve, since such an address could have
/// a private key.
pub fn create_program_address(
    seeds: &[&[u8]],
    program_id: &Address,
) -> Result<Address, SolError> {
    if seeds.len() > MAX_SEEDS {
        return Err(SolError::InvalidSeeds(format!(
            "{} seeds exceeds the maximum of {MAX_SEEDS}",
            seeds.len()
        )));
    }
    check_seed_lengths(seeds)?;

    hash_off_curve(seeds, &[], program_id).ok_or_else(|| {
        SolError::InvalidSeeds("derived address lies on the ed25519 curve".into())
    })
}

fn check_seed_lengths(seeds: &[&[u8]]) -> Result<(), SolError> {
    for (index, seed) in seeds.iter().enumerate() {
        if seed.len() > MAX_SEED_LEN {
            return Err(SolError::InvalidSeeds(format!(
                "seed {index} is {} bytes (max {MAX_SEED_LEN})",
                seed.len()
            )));
        }
    }
    Ok(())
}

/// Hash seeds + optional bump + program id; `None` when the point is on the curve.
fn hash_off_curve(seeds: &[&[u8]], bump_seed: &[u8], program_id: &Address) -> Option<Address> {
    let mut hasher = Sha256::new();

    for seed in seeds {
        hasher.update(seed);
    }
    hasher.update(bump_seed);
    hasher.update(program_id.as_bytes());
    hasher.update(PDA_MARKER);

    let hash: [u8; 32] = hasher.finalize().into();
    let address = Address::new(hash);

    // A valid PDA must NOT be on the Ed25519 curve.
    if address.is_on_curve() {
        return None;
    }

    Some(address)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROGRAM: Address = Address::new([0x5au8; 32]);

    #[test]
    fn pda_is_not_on_curve() {
        let (pda, _bump) = find_program_address(&[b"ingl_config"], &PROGRAM).unwrap();
        assert!(!pda.is_on_curve(), "PDA must NOT be on the Ed25519 curve");
    }

    #[test]
    fn pda_derivation_is_deterministic() {
        let mint = [0x22u8; 32];
        let first = find_program_address(&[b"gem_account", &mint], &PROGRAM).unwrap();
        let second = find_program_address(&[b"gem_account", &mint], &PROGRAM).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn seed_order_changes_address() {
        let (ab, _) = find_program_address(&[b"alpha", b"beta"], &PROGRAM).unwrap();
        let (ba, _) = find_program_address(&[b"beta", b"alpha"], &PROGRAM).unwrap();
        assert_ne!(ab, ba);
    }

    #[test]
    fn owner_changes_address() {
        let other = Address::new([0x5bu8; 32]);
        let (a, _) = find_program_address(&[b"vote_account"], &PROGRAM).unwrap();
        let (b, _) = find_program_address(&[b"vote_account"], &other).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn create_with_found_bump_matches_find() {
        let seeds: &[&[u8]] = &[b"general_account"];
        let (pda, bump) = find_program_address(seeds, &PROGRAM).unwrap();
        let recreated = create_program_address(&[b"general_account", &[bump]], &PROGRAM).unwrap();
        assert_eq!(pda, recreated);
    }

    #[test]
    fn oversized_seed_is_rejected() {
        let long = [0u8; 33];
        let err = find_program_address(&[&long], &PROGRAM).unwrap_err();
        assert!(matches!(err, SolError::InvalidSeeds(_)));
    }

    #[test]
    fn too_many_seeds_is_rejected() {
        let seeds: Vec<&[u8]> = vec![b"s".as_slice(); MAX_SEEDS];
        let err = find_program_address(&seeds, &PROGRAM).unwrap_err();
        assert!(matches!(err, SolError::InvalidSeeds(_)));
    }

    #[test]
    fn on_curve_check_accepts_basepoint() {
        // The Ed25519 basepoint (compressed form).
        let basepoint: [u8; 32] = [
            0x58, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66,
            0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66,
            0x66, 0x66, 0x66, 0x66,
        ];
        assert!(Address::new(basepoint).is_on_curve());
    }

    #[test]
    fn on_curve_check_rejects_off_curve_bytes() {
        // y = 0x020202...02 has no matching x on the curve.
        assert!(!Address::new([0x02; 32]).is_on_curve());
    }
}
