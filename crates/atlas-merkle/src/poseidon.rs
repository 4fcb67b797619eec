// SPDX-License-Identifier: MIT OR Apache-2.0

//! Poseidon2 permutation and sponge over the BN254 scalar field.
//!
//! Parameters: width `t = 3`, S-box `x^5`, 8 external rounds (4 before and
//! 4 after) and 56 internal rounds. Round constants are derived once from
//! a BLAKE3 XOF under a fixed domain tag and rejection-free reduced into
//! the field; the derivation is part of the wire contract and is replayed
//! by the circuit adapter.
//!
//! The hasher is a process-wide singleton: constant derivation runs once,
//! and the permutation itself is read-only and callable from any worker
//! thread.

use crate::F;
use ark_ff::{Field, PrimeField, Zero};
use std::sync::OnceLock;

/// Domain tag for the round-constant derivation.
const DOMAIN_TAG: &[u8] = b"shadow-atlas/poseidon2-bn254/v1";

/// State width.
const T: usize = 3;
/// External (full) rounds, split 4 + 4 around the internal run.
const ROUNDS_F: usize = 8;
/// Internal (partial) rounds.
const ROUNDS_P: usize = 56;

/// The Poseidon2 hasher: derived round constants plus the permutation.
pub struct Poseidon2 {
    external_rc: [[F; T]; ROUNDS_F],
    internal_rc: [F; ROUNDS_P],
    two_to_one_tag: F,
}

static HASHER: OnceLock<Poseidon2> = OnceLock::new();

/// The process-wide hasher singleton.
#[must_use]
pub fn hasher() -> &'static Poseidon2 {
    HASHER.get_or_init(Poseidon2::derive)
}

impl Poseidon2 {
    /// Derive all round constants from the BLAKE3 XOF.
    ///
    /// Draw order is fixed: 8 × 3 external constants, 56 internal
    /// constants, then the two-to-one domain tag. 64 bytes per draw,
    /// little-endian reduced into the field.
    #[must_use]
    pub fn derive() -> Self {
        let mut xof = blake3::Hasher::new();
        xof.update(DOMAIN_TAG);
        let mut reader = xof.finalize_xof();
        let mut draw = || {
            let mut buf = [0u8; 64];
            reader.fill(&mut buf);
            F::from_le_bytes_mod_order(&buf)
        };

        let mut external_rc = [[F::zero(); T]; ROUNDS_F];
        for round in &mut external_rc {
            for c in round.iter_mut() {
                *c = draw();
            }
        }
        let mut internal_rc = [F::zero(); ROUNDS_P];
        for c in &mut internal_rc {
            *c = draw();
        }
        let two_to_one_tag = draw();

        Self {
            external_rc,
            internal_rc,
            two_to_one_tag,
        }
    }

    #[inline]
    fn sbox(x: &mut F) {
        let x2 = x.square();
        let x4 = x2.square();
        *x *= x4;
    }

    /// External matrix `circ(2, 1, 1)`: `s_i += sum(s)`.
    #[inline]
    fn external_matrix(state: &mut [F; T]) {
        let sum = state[0] + state[1] + state[2];
        state[0] += sum;
        state[1] += sum;
        state[2] += sum;
    }

    /// Internal matrix `diag(1, 1, 2) + ones`.
    #[inline]
    fn internal_matrix(state: &mut [F; T]) {
        let sum = state[0] + state[1] + state[2];
        state[2].double_in_place();
        state[0] += sum;
        state[1] += sum;
        state[2] += sum;
    }

    /// The Poseidon2 permutation.
    pub fn permute(&self, state: &mut [F; T]) {
        Self::external_matrix(state);

        for round in 0..ROUNDS_F / 2 {
            for (s, rc) in state.iter_mut().zip(&self.external_rc[round]) {
                *s += rc;
                Self::sbox(s);
            }
            Self::external_matrix(state);
        }

        for rc in &self.internal_rc {
            state[0] += rc;
            Self::sbox(&mut state[0]);
            Self::internal_matrix(state);
        }

        for round in ROUNDS_F / 2..ROUNDS_F {
            for (s, rc) in state.iter_mut().zip(&self.external_rc[round]) {
                *s += rc;
                Self::sbox(s);
            }
            Self::external_matrix(state);
        }
    }

    /// Sponge over an input sequence: rate 2, capacity 1. The capacity is
    /// initialized with the input length so `[a]` and `[a, 0]` absorb
    /// differently.
    #[must_use]
    pub fn hash_fields(&self, inputs: &[F]) -> F {
        let mut state = [F::zero(), F::zero(), F::from(inputs.len() as u64)];
        if inputs.is_empty() {
            self.permute(&mut state);
            return state[0];
        }
        for chunk in inputs.chunks(2) {
            state[0] += chunk[0];
            if let Some(second) = chunk.get(1) {
                state[1] += second;
            }
            self.permute(&mut state);
        }
        state[0]
    }

    /// Two-to-one compression for internal tree nodes.
    #[must_use]
    pub fn hash_two(&self, left: F, right: F) -> F {
        let mut state = [left, right, self.two_to_one_tag];
        self.permute(&mut state);
        state[0]
    }
}
