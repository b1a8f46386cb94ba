//! Coherent 1-D value noise. Deterministic: the same (t, octaves, seed)
//! always produces the same value, with no RNG state.

/// Base lattice frequency of the first octave, in cells per unit time.
const BASE_FREQUENCY: f64 = 4.0;

/// Deterministic hash of a lattice cell → [0, 1]. Same construction as
/// the per-pixel twinkle hash: integer mixing, then take the low bits.
fn hash_cell(seed: u64, octave: u32, cell: i64) -> f64 {
    let mut x = (cell as u64)
        .wrapping_mul(2_654_435_761)
        .wrapping_add(seed.wrapping_mul(0x9E37_79B9_7F4A_7C15))
        ^ u64::from(octave).wrapping_mul(2_246_822_519);
    x = x.wrapping_mul(x).wrapping_add(x);
    x ^= x >> 16;
    (x & 0xFFFF) as f64 / 65535.0
}

/// Smoothstep fade between lattice values.
fn fade(t: f64) -> f64 {
    t * t * (3.0 - 2.0 * t)
}

/// One octave of value noise at position `pos` (lattice units).
fn value_noise(seed: u64, octave: u32, pos: f64) -> f64 {
    let cell = pos.floor();
    let frac = pos - cell;
    #[allow(clippy::cast_possible_truncation)]
    let cell = cell as i64;
    let a = hash_cell(seed, octave, cell);
    let b = hash_cell(seed, octave, cell + 1);
    a + (b - a) * fade(frac)
}

/// Coherent noise at time `t` with `octaves` layers. Each octave doubles
/// the frequency and halves the amplitude; the sum is renormalized so the
/// output stays in [0, 1]. `octaves` must be ≥ 1 (validated by the curve
/// generator before calling).
pub fn octave_noise(t: f64, octaves: u32, seed: u64) -> f64 {
    let mut sum = 0.0;
    let mut amplitude = 1.0;
    let mut frequency = BASE_FREQUENCY;
    let mut norm = 0.0;

    for octave in 0..octaves.max(1) {
        sum += amplitude * value_noise(seed, octave, t * frequency);
        norm += amplitude;
        amplitude *= 0.5;
        frequency *= 2.0;
    }

    sum / norm
}
