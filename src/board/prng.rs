/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

/// Fixed seed state, so that hash keys are identical between builds.
const SEED: [u64; 4] = [
    0x91C5_AB3C_EBFD_5A71,
    0x06BA_253B_9DD8_97CD,
    0x8015_B5E5_9CC2_75E9,
    0xF8F4_27FC_5411_DE53,
];

/// A `const`-evaluable xoshiro256** generator.
///
/// Only used at compile time to fill the Zobrist key table, so it is passed by value and
/// every call hands back the advanced state alongside the output.
///
/// Algorithm from <https://prng.di.unimi.it/xoshiro256starstar.c>
#[derive(Clone, Copy, Debug)]
pub struct Xoshiro256([u64; 4]);

impl Xoshiro256 {
    #[inline(always)]
    pub const fn new() -> Self {
        Self(SEED)
    }

    /// Returns the next output and the advanced generator.
    pub const fn next(self) -> (u64, Self) {
        let mut s = self.0;
        let output = s[1].wrapping_mul(5).rotate_left(7).wrapping_mul(9);
        let t = s[1] << 17;

        s[2] ^= s[0];
        s[3] ^= s[1];
        s[1] ^= s[2];
        s[0] ^= s[3];
        s[2] ^= t;
        s[3] = s[3].rotate_left(45);

        (output, Self(s))
    }
}

impl Default for Xoshiro256 {
    fn default() -> Self {
        Self::new()
    }
}
