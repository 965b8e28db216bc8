//! FFT facade and twiddle-factor cache.
//!
//! The transform kernel itself (root-of-unity computation, butterflies,
//! mixed-radix/Bluestein fallback for non-power-of-two lengths) is supplied
//! by [`rustfft`]; this module's surface is caching per-length plans under
//! concurrent first-touch, coercing heterogeneous numeric inputs to
//! complex, and the small normalization/magnitude/frequency-axis helpers
//! built on top.
//!
//! ## Cache construction
//!
//! A length `n` not yet seen needs exactly one [`rustfft::FftPlanner`]
//! build, even under concurrent first-touch from many callers. This is a
//! two-level lock: an outer `RwLock<HashMap<usize, Arc<Entry>>>` guards
//! *which lengths have an entry at all* (read-locked on the fast path, only
//! write-locked the first time a length is seen), and each [`Entry`] holds
//! a [`std::sync::OnceLock`] that blocks every racing caller on the single
//! thread that actually wins the build — `OnceLock` is this corpus's
//! idiomatic realization of "a per-entry latch."
use num_complex::Complex64;
use rustfft::{Fft, FftPlanner};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};

struct Entry {
    plan: OnceLock<TwiddlePlan>,
}

struct TwiddlePlan {
    forward: Arc<dyn Fft<f64>>,
    inverse: Arc<dyn Fft<f64>>,
}

/// Per-length cache of forward/inverse FFT plans.
pub struct FftCache {
    table: RwLock<HashMap<usize, Arc<Entry>>>,
}

impl Default for FftCache {
    fn default() -> Self {
        Self::new()
    }
}

impl FftCache {
    pub fn new() -> Self {
        Self {
            table: RwLock::new(HashMap::new()),
        }
    }

    fn entry_for(&self, n: usize) -> Arc<Entry> {
        if let Some(entry) = self.table.read().expect("fft cache poisoned").get(&n) {
            return entry.clone();
        }
        self.table
            .write()
            .expect("fft cache poisoned")
            .entry(n)
            .or_insert_with(|| {
                Arc::new(Entry {
                    plan: OnceLock::new(),
                })
            })
            .clone()
    }

    fn plan_pair(&self, n: usize) -> (Arc<dyn Fft<f64>>, Arc<dyn Fft<f64>>) {
        let entry = self.entry_for(n);
        let plan = entry.plan.get_or_init(|| {
            let mut planner = FftPlanner::new();
            TwiddlePlan {
                forward: planner.plan_fft_forward(n),
                inverse: planner.plan_fft_inverse(n),
            }
        });
        (plan.forward.clone(), plan.inverse.clone())
    }
}

/// Capability trait coercing a supported scalar slice kind to a fresh
/// `Vec<Complex64>`, resolved at compile time by the caller rather than by
/// runtime type discrimination.
pub trait ToComplexSamples {
    fn to_complex_samples(&self) -> Vec<Complex64>;
}

macro_rules! impl_to_complex_samples_real {
    ($($t:ty),* $(,)?) => {
        $(
            impl ToComplexSamples for [$t] {
                fn to_complex_samples(&self) -> Vec<Complex64> {
                    self.iter().map(|&x| Complex64::new(x as f64, 0.0)).collect()
                }
            }
        )*
    };
}

impl_to_complex_samples_real!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64);

impl ToComplexSamples for [Complex64] {
    fn to_complex_samples(&self) -> Vec<Complex64> {
        self.to_vec()
    }
}

impl ToComplexSamples for [num_complex::Complex32] {
    fn to_complex_samples(&self) -> Vec<Complex64> {
        self.iter()
            .map(|c| Complex64::new(c.re as f64, c.im as f64))
            .collect()
    }
}

/// Coerces `input` to complex samples and runs `pick`'s plan over them,
/// writing into and returning `dest` when given rather than discarding it —
/// mirroring `examples/original_source/fft.go`'s `Coefficients(dst, in)`,
/// which reuses a caller-supplied destination slice instead of allocating.
fn apply_plan<S: ToComplexSamples + ?Sized>(
    cache: &FftCache,
    input: &S,
    dest: Option<Vec<Complex64>>,
    pick: impl Fn(&(Arc<dyn Fft<f64>>, Arc<dyn Fft<f64>>)) -> &Arc<dyn Fft<f64>>,
) -> Vec<Complex64> {
    let samples = input.to_complex_samples();
    let mut buf = match dest {
        Some(mut dest) => {
            assert_eq!(
                dest.len(),
                samples.len(),
                "dest length {} does not match input length {}",
                dest.len(),
                samples.len()
            );
            dest.copy_from_slice(&samples);
            dest
        }
        None => samples,
    };
    let pair = cache.plan_pair(buf.len());
    pick(&pair).process(&mut buf);
    buf
}

/// Unnormalized forward transform: `fft(x)` followed by `norm(fft(x))` and
/// `ifft` recovers `x` up to floating-point error. Writes into and returns
/// `dest` if given, otherwise allocates a fresh buffer.
pub fn fft<S: ToComplexSamples + ?Sized>(
    cache: &FftCache,
    input: &S,
    dest: Option<Vec<Complex64>>,
) -> Vec<Complex64> {
    apply_plan(cache, input, dest, |(fwd, _)| fwd)
}

/// Unnormalized inverse transform. `ifft(fft(x))` multiplies `x` by its
/// length `n`. Writes into and returns `dest` if given, otherwise allocates
/// a fresh buffer.
pub fn ifft<S: ToComplexSamples + ?Sized>(
    cache: &FftCache,
    input: &S,
    dest: Option<Vec<Complex64>>,
) -> Vec<Complex64> {
    apply_plan(cache, input, dest, |(_, inv)| inv)
}

/// Divides every coefficient by `n`, in place.
pub fn norm(buf: &mut [Complex64]) {
    let factor = 1.0 / buf.len() as f64;
    for c in buf.iter_mut() {
        *c *= factor;
    }
}

/// Divides every coefficient by `sqrt(n)`, in place.
pub fn norm_ortho(buf: &mut [Complex64]) {
    let factor = 1.0 / (buf.len() as f64).sqrt();
    for c in buf.iter_mut() {
        *c *= factor;
    }
}

/// Elementwise magnitude of `input`. Writes into and returns `dest` if
/// given (its length must match `input`'s), otherwise allocates a fresh
/// buffer — mirrors `examples/original_source/fft.go`'s `Mag`.
pub fn mag(input: &[Complex64], dest: Option<Vec<f64>>) -> Vec<f64> {
    let mut dest = match dest {
        Some(dest) => {
            assert_eq!(dest.len(), input.len(), "dest length mismatch");
            dest
        }
        None => vec![0.0; input.len()],
    };
    for (d, c) in dest.iter_mut().zip(input.iter()) {
        *d = c.norm();
    }
    dest
}

/// The frequency axis `[0, 1, ..., n-1] * sampling_hz / n`.
pub fn freq(n: usize, sampling_hz: f64) -> Vec<f64> {
    let factor = sampling_hz / n as f64;
    (0..n).map(|i| i as f64 * factor).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;
    use std::thread;

    #[test]
    fn round_trip_recovers_input_after_norm() {
        let cache = FftCache::new();
        let input: Vec<f64> = (0..16).map(|i| (i as f64 * 0.3).sin()).collect();

        let mut spectrum = fft(&cache, input.as_slice(), None);
        norm(&mut spectrum);
        let recovered = ifft(&cache, spectrum.as_slice(), None);

        for (x, y) in input.iter().zip(recovered.iter()) {
            assert!((x - y.re).abs() < 1e-9);
            assert!(y.im.abs() < 1e-9);
        }
    }

    #[test]
    fn ifft_of_fft_scales_by_length() {
        let cache = FftCache::new();
        let input: Vec<f64> = vec![1.0, 0.0, -1.0, 0.0];
        let n = input.len() as f64;

        let spectrum = fft(&cache, input.as_slice(), None);
        let round_tripped = ifft(&cache, spectrum.as_slice(), None);

        for (x, y) in input.iter().zip(round_tripped.iter()) {
            assert!((x * n - y.re).abs() < 1e-9);
        }
    }

    #[test]
    fn freq_axis_matches_formula() {
        let axis = freq(4, 1000.0);
        assert_eq!(axis, vec![0.0, 250.0, 500.0, 750.0]);
    }

    #[test]
    fn norm_ortho_divides_by_sqrt_n() {
        let mut buf = vec![Complex64::new(4.0, 0.0); 4];
        norm_ortho(&mut buf);
        for c in buf {
            assert!((c.re - 2.0).abs() < 1e-12);
        }
    }

    #[test]
    #[should_panic(expected = "does not match")]
    fn fft_panics_on_dest_length_mismatch() {
        let cache = FftCache::new();
        let input = vec![1.0_f64, 2.0, 3.0, 4.0];
        let bad_dest = vec![Complex64::new(0.0, 0.0); 2];
        fft(&cache, input.as_slice(), Some(bad_dest));
    }

    #[test]
    fn fft_writes_into_and_returns_the_supplied_dest() {
        let cache = FftCache::new();
        let input = vec![1.0_f64, 0.0, -1.0, 0.0];
        let dest = vec![Complex64::new(-99.0, -99.0); 4];

        let without_dest = fft(&cache, input.as_slice(), None);
        let with_dest = fft(&cache, input.as_slice(), Some(dest));

        assert_eq!(with_dest, without_dest);
    }

    #[test]
    fn mag_writes_into_and_returns_the_supplied_dest() {
        let input = vec![Complex64::new(3.0, 4.0), Complex64::new(0.0, -2.0)];
        let dest = vec![-1.0; 2];

        let result = mag(&input, Some(dest));

        assert_eq!(result, vec![5.0, 2.0]);
    }

    #[test]
    fn concurrent_first_touch_builds_exactly_one_plan() {
        let cache = Arc::new(FftCache::new());
        let n = 256;
        let threads = 16;
        let barrier = Arc::new(Barrier::new(threads));

        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let cache = cache.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    let (fwd, _) = cache.plan_pair(n);
                    Arc::as_ptr(&fwd) as usize
                })
            })
            .collect();

        let pointers: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let first = pointers[0];
        assert!(
            pointers.iter().all(|&p| p == first),
            "every caller must observe the same plan instance"
        );
    }

    #[test]
    fn accepts_heterogeneous_scalar_kinds() {
        let cache = FftCache::new();
        let ints: Vec<i32> = vec![1, 2, 3, 4];
        let floats: Vec<f64> = vec![1.0, 2.0, 3.0, 4.0];

        let a = fft(&cache, ints.as_slice(), None);
        let b = fft(&cache, floats.as_slice(), None);
        assert_eq!(a, b);
    }
}
