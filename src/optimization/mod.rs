//! Self-tuning of band-pass filter parameters.
//!
//! A filter triple `(lowcut, highcut, order)` is scored on a signal by
//! [`FitnessEvaluator`] and the score is minimised by [`CatSwarmOptimizer`].
//!
//! ```rust
//! use vitals_dsp::optimization::*;
//! use vitals_dsp::{FilterParams, sine_wave};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let signal = sine_wave(1.2, 10.0, 30.0, 1.0);
//! let evaluator = FitnessEvaluator::new(&signal, 30.0);
//!
//! let result = CatSwarmOptimizer::new(
//!     |p: &[f64]| evaluator.evaluate(p),
//!     SearchBounds::pulse_filter(),
//!     CatSwarmConfig::fast().with_seed(1),
//! )?
//! .run();
//!
//! let tuned = FilterParams::from_position(&result.best_position)?;
//! assert!(tuned.lowcut < tuned.highcut);
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

pub mod cat_swarm;
pub mod fitness;
pub mod types;

pub use cat_swarm::{Cat, CatMode, CatSwarmOptimizer, OptimizationResult, SwarmState, cat_swarm_optimize};
pub use fitness::{FITNESS_PENALTY, FitnessEvaluator, evaluate_filter_fitness, snr_fitness};
pub use types::{CatSwarmConfig, SearchBounds};
