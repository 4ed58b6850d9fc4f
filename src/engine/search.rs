// src/engine/search.rs
//
// Quality search: find the highest integer quality whose encoded size fits
// the budget, with as few trial encodes as possible.
//
// 1. Probe q_max. Fits -> AlreadyOkAtMax (1 iteration).
// 2. Probe q_min. Too big -> NoSolutionWithinBounds (2 iterations).
// 3. Bisect the full range [q_min, q_max]. Every step counts as an
//    iteration, but a step landing on q_min or q_max reuses the measured
//    probe instead of encoding again. Iterations stay within
//    2 + floor(log2(levels)) + 1, encodes within 2 + ceil(log2(levels)).
//
// Assumes encoded size never decreases as quality increases. That is not
// verified: on a non-monotonic curve the result fits the budget but may not
// be the highest fitting quality.

use crate::engine::common::EngineResult;
use crate::engine::encoder::Encoder;
use crate::engine::policy::CompressionStatus;
use crate::engine::probe::{fits, size_kb};
use crate::engine::source::SourceImage;
use crate::request::{OutputFormat, QualityBounds};
use tracing::debug;

/// What the search settled on.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    pub bytes: Vec<u8>,
    pub quality: u8,
    /// Probes plus bisection steps (see module docs for the accounting)
    pub iterations: u32,
    pub status: CompressionStatus,
}

/// One measured encode.
struct Probe {
    quality: u8,
    bytes: Vec<u8>,
    fits: bool,
}

/// Integer bisection over encoder quality.
pub struct QualitySearch<'a, E: ?Sized> {
    encoder: &'a E,
    parallel_probes: bool,
}

impl<'a, E> QualitySearch<'a, E>
where
    E: Encoder + Sync + ?Sized,
{
    pub fn new(encoder: &'a E) -> Self {
        Self {
            encoder,
            parallel_probes: false,
        }
    }

    /// Encode q_max and q_min concurrently. The q_min result is thrown away
    /// (and not counted) when q_max already fits.
    pub fn parallel_probes(mut self, parallel: bool) -> Self {
        self.parallel_probes = parallel;
        self
    }

    pub fn run(
        &self,
        image: &SourceImage,
        format: OutputFormat,
        target_kb: u32,
        bounds: QualityBounds,
    ) -> EngineResult<SearchOutcome> {
        let (top, speculative_bottom) = if self.parallel_probes && bounds.min < bounds.max {
            let (top, bottom) = rayon::join(
                || self.probe(image, format, bounds.max, target_kb),
                || self.probe(image, format, bounds.min, target_kb),
            );
            (top?, Some(bottom))
        } else {
            (self.probe(image, format, bounds.max, target_kb)?, None)
        };

        if top.fits {
            return Ok(outcome(top, 1, CompressionStatus::AlreadyOkAtMax));
        }

        let bottom = match speculative_bottom {
            Some(result) => result?,
            // Single-level range: q_min is the probe just measured.
            None if bounds.min == bounds.max => top,
            None => self.probe(image, format, bounds.min, target_kb)?,
        };
        let mut iterations = 2;

        if !bottom.fits {
            return Ok(outcome(
                bottom,
                iterations,
                CompressionStatus::NoSolutionWithinBounds,
            ));
        }

        let mut best = bottom;
        let mut lo = i32::from(bounds.min);
        let mut hi = i32::from(bounds.max);

        while lo <= hi {
            let mid = (lo + hi) / 2;
            iterations += 1;

            let within = match mid as u8 {
                // q_max was measured over budget, q_min within it (and is still `best`)
                q if q == bounds.max => false,
                q if q == bounds.min => true,
                q => {
                    let probe = self.probe(image, format, q, target_kb)?;
                    let within = probe.fits;
                    if within {
                        best = probe;
                    }
                    within
                }
            };

            if within {
                lo = mid + 1;
            } else {
                hi = mid - 1;
            }
        }

        Ok(outcome(best, iterations, CompressionStatus::Ok))
    }

    fn probe(
        &self,
        image: &SourceImage,
        format: OutputFormat,
        quality: u8,
        target_kb: u32,
    ) -> EngineResult<Probe> {
        let bytes = self.encoder.encode(image, format, Some(quality))?;
        let kb = size_kb(&bytes);
        let within = fits(kb, target_kb);
        debug!(
            target: "sizefit::search",
            %format,
            quality,
            kb,
            fits = within,
            "probe"
        );
        Ok(Probe {
            quality,
            bytes,
            fits: within,
        })
    }
}

fn outcome(probe: Probe, iterations: u32, status: CompressionStatus) -> SearchOutcome {
    SearchOutcome {
        bytes: probe.bytes,
        quality: probe.quality,
        iterations,
        status,
    }
}

/// Run a sequential search with `encoder`.
pub fn search<E>(
    encoder: &E,
    image: &SourceImage,
    format: OutputFormat,
    target_kb: u32,
    bounds: QualityBounds,
) -> EngineResult<SearchOutcome>
where
    E: Encoder + Sync + ?Sized,
{
    QualitySearch::new(encoder).run(image, format, target_kb, bounds)
}

/// Upper bound on reported iterations for a range: the two endpoint probes
/// plus floor(log2(levels)) + 1 bisection steps.
pub fn max_iterations(bounds: QualityBounds) -> u32 {
    let levels = bounds.levels();
    2 + (u32::BITS - levels.leading_zeros())
}

/// Upper bound on actual encoder calls: 2 + ceil(log2(levels)). Lower than
/// [`max_iterations`] because endpoint steps reuse their probes.
pub fn max_encodes(bounds: QualityBounds) -> u32 {
    2 + bounds.levels().next_power_of_two().trailing_zeros()
}
