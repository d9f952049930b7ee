//! Cat Swarm Optimization (CSO).
//!
//! A population-based, gradient-free minimiser over a bounded box. Each cat
//! holds a position, a velocity and the fitness of its position. Every
//! iteration each cat independently flips a coin weighted by
//! `mixture_ratio` and then either:
//!
//! - **seeks**: draws `smp` copies of its position, perturbs each coordinate
//!   with probability 0.5 by `U(-srd, srd) * (max - min)`, clamps, and moves to
//!   the best copy; or
//! - **tracks**: adds `U(0, 1) ⊙ (global_best - position)` to its velocity,
//!   clamps the velocity to `±max_velocity`, moves by it and clamps.
//!
//! The global best is read before an iteration and written only after every
//! cat has moved, so no cat sees an update from its own iteration. Each cat
//! draws from its own RNG, seeded from the optimizer RNG in cat order, which
//! keeps runs reproducible whether cats are updated sequentially or, with the
//! `parallel-processing` feature, in parallel.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

#[cfg(feature = "parallel-processing")]
use rayon::prelude::*;

use crate::VitalsResult;
use crate::optimization::types::{CatSwarmConfig, SearchBounds};

/// Behaviour a cat used in its most recent iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CatMode {
    /// Local search around the current position
    Seeking,
    /// Velocity-driven pursuit of the global best
    Tracking,
}

/// One member of the swarm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cat {
    /// Current position, always inside the search bounds
    pub position: Vec<f64>,
    /// Current velocity, each component within `±max_velocity`
    pub velocity: Vec<f64>,
    /// Objective value at `position`
    pub fitness: f64,
    /// Mode of the last update; `None` before the first iteration
    pub mode: Option<CatMode>,
}

/// Snapshot of the swarm between iterations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwarmState {
    /// All cats, in creation order
    pub cats: Vec<Cat>,
    /// Best position found so far
    pub best_position: Vec<f64>,
    /// Objective value at `best_position`
    pub best_score: f64,
    /// Number of completed iterations
    pub iteration: usize,
}

/// Outcome of an optimization run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResult {
    /// Best position found across the whole run
    pub best_position: Vec<f64>,
    /// Objective value at `best_position`
    pub best_score: f64,
    /// Global best score after each iteration; non-increasing
    pub history: Vec<f64>,
}

/// Cat Swarm Optimizer over an objective `Fn(&[f64]) -> f64`, minimised.
///
/// The objective must be total: it should score invalid positions with a large
/// penalty rather than panic. NaN scores are treated as `+inf`.
///
/// # Examples
///
/// ```rust
/// use vitals_dsp::optimization::{CatSwarmConfig, CatSwarmOptimizer, SearchBounds};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let bounds = SearchBounds::new(vec![(-1.0, 1.0), (-1.0, 1.0)])?;
/// let config = CatSwarmConfig::new().with_seed(3);
/// let sphere = |x: &[f64]| x.iter().map(|v| v * v).sum::<f64>();
///
/// let result = CatSwarmOptimizer::new(sphere, bounds, config)?.run();
/// assert_eq!(result.history.len(), config.max_iter);
/// assert!(result.best_score < 0.1);
/// # Ok(())
/// # }
/// # example().unwrap();
/// ```
pub struct CatSwarmOptimizer<F>
where
    F: Fn(&[f64]) -> f64 + Sync,
{
    objective: F,
    bounds: SearchBounds,
    widths: Vec<f64>,
    config: CatSwarmConfig,
    rng: StdRng,
    state: SwarmState,
    history: Vec<f64>,
}

impl<F> CatSwarmOptimizer<F>
where
    F: Fn(&[f64]) -> f64 + Sync,
{
    /// Create an optimizer and evaluate an initial swarm placed uniformly at
    /// random inside `bounds`, with zero velocities.
    ///
    /// # Errors
    ///
    /// Returns a parameter error if `config` is invalid.
    pub fn new(objective: F, bounds: SearchBounds, config: CatSwarmConfig) -> VitalsResult<Self> {
        config.validate()?;

        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        let cats: Vec<Cat> = (0..config.n_cats)
            .map(|_| {
                let position: Vec<f64> = bounds
                    .as_slice()
                    .iter()
                    .map(|&(lo, hi)| rng.random_range(lo..=hi))
                    .collect();
                let fitness = score(&objective, &position);
                Cat {
                    velocity: vec![0.0; position.len()],
                    position,
                    fitness,
                    mode: None,
                }
            })
            .collect();

        let mut state = SwarmState {
            best_position: cats[0].position.clone(),
            best_score: f64::INFINITY,
            cats,
            iteration: 0,
        };
        update_global_best(&mut state);

        debug!(
            n_cats = config.n_cats,
            max_iter = config.max_iter,
            dim = bounds.dim(),
            initial_best = state.best_score,
            "Initialised cat swarm"
        );

        Ok(Self {
            objective,
            widths: bounds.widths(),
            bounds,
            config,
            rng,
            state,
            history: Vec::with_capacity(config.max_iter),
        })
    }

    /// Run one iteration and return the global best score afterwards.
    ///
    /// Can be called past `max_iter`; [`run`](Self::run) stops at it.
    pub fn step(&mut self) -> f64 {
        self.advance(cfg!(feature = "parallel-processing"))
    }

    /// One iteration, moving cats on the rayon pool when `parallel` is set
    /// and the `parallel-processing` feature is enabled.
    fn advance(&mut self, parallel: bool) -> f64 {
        let seeds: Vec<u64> = (0..self.state.cats.len()).map(|_| self.rng.random()).collect();
        let leader = self.state.best_position.clone();

        let ctx = MoveContext {
            objective: &self.objective,
            bounds: &self.bounds,
            widths: &self.widths,
            config: &self.config,
            leader: &leader,
        };

        if parallel {
            move_cats_parallel(&ctx, &mut self.state.cats, seeds);
        } else {
            move_cats(&ctx, &mut self.state.cats, seeds);
        }

        update_global_best(&mut self.state);
        self.state.iteration += 1;
        self.history.push(self.state.best_score);

        trace!(
            iteration = self.state.iteration,
            best_score = self.state.best_score,
            "Cat swarm iteration"
        );

        self.state.best_score
    }

    /// Current swarm.
    pub const fn swarm(&self) -> &SwarmState {
        &self.state
    }

    /// The search bounds.
    pub const fn bounds(&self) -> &SearchBounds {
        &self.bounds
    }

    /// Global best score after each completed iteration.
    pub fn history(&self) -> &[f64] {
        &self.history
    }

    /// Run the remaining iterations up to `max_iter` and return the best
    /// position found.
    pub fn run(mut self) -> OptimizationResult {
        while self.state.iteration < self.config.max_iter {
            self.step();
        }

        debug!(
            iterations = self.state.iteration,
            best_score = self.state.best_score,
            best_position = ?self.state.best_position,
            "Cat swarm finished"
        );

        OptimizationResult {
            best_position: self.state.best_position,
            best_score: self.state.best_score,
            history: self.history,
        }
    }
}

/// Minimise `objective` over `bounds` with Cat Swarm Optimization.
///
/// # Errors
///
/// Fails only when the bounds or the configuration are invalid; the objective
/// cannot make a run fail.
pub fn cat_swarm_optimize<F>(
    objective: F,
    bounds: &[(f64, f64)],
    config: &CatSwarmConfig,
) -> VitalsResult<OptimizationResult>
where
    F: Fn(&[f64]) -> f64 + Sync,
{
    let bounds = SearchBounds::new(bounds.to_vec())?;
    Ok(CatSwarmOptimizer::new(objective, bounds, *config)?.run())
}

/// Everything a cat reads while moving. Shared immutably across cats.
struct MoveContext<'a, F> {
    objective: &'a F,
    bounds: &'a SearchBounds,
    widths: &'a [f64],
    config: &'a CatSwarmConfig,
    leader: &'a [f64],
}

impl<F> MoveContext<'_, F>
where
    F: Fn(&[f64]) -> f64 + Sync,
{
    fn update(&self, cat: &mut Cat, rng: &mut StdRng) {
        if rng.random_bool(self.config.mixture_ratio) {
            self.seek(cat, rng);
        } else {
            self.track(cat, rng);
        }
    }

    fn seek(&self, cat: &mut Cat, rng: &mut StdRng) {
        let srd = self.config.srd;
        let mut best: Option<(Vec<f64>, f64)> = None;

        for _ in 0..self.config.smp {
            let mut candidate = cat.position.clone();
            for (x, &width) in candidate.iter_mut().zip(self.widths) {
                if rng.random_bool(0.5) {
                    *x += rng.random_range(-srd..=srd) * width;
                }
            }
            self.bounds.clamp(&mut candidate);

            let fitness = score(self.objective, &candidate);
            if best.as_ref().is_none_or(|(_, f)| fitness < *f) {
                best = Some((candidate, fitness));
            }
        }

        if let Some((position, fitness)) = best {
            cat.position = position;
            cat.fitness = fitness;
        }
        cat.mode = Some(CatMode::Seeking);
    }

    fn track(&self, cat: &mut Cat, rng: &mut StdRng) {
        let max_velocity = self.config.max_velocity;

        for ((v, x), &target) in cat.velocity.iter_mut().zip(cat.position.iter_mut()).zip(self.leader) {
            *v += rng.random::<f64>() * (target - *x);
            *v = v.clamp(-max_velocity, max_velocity);
            *x += *v;
        }
        self.bounds.clamp(&mut cat.position);

        cat.fitness = score(self.objective, &cat.position);
        cat.mode = Some(CatMode::Tracking);
    }
}

fn move_cats<F>(ctx: &MoveContext<'_, F>, cats: &mut [Cat], seeds: Vec<u64>)
where
    F: Fn(&[f64]) -> f64 + Sync,
{
    for (cat, seed) in cats.iter_mut().zip(seeds) {
        ctx.update(cat, &mut StdRng::seed_from_u64(seed));
    }
}

#[cfg(feature = "parallel-processing")]
fn move_cats_parallel<F>(ctx: &MoveContext<'_, F>, cats: &mut [Cat], seeds: Vec<u64>)
where
    F: Fn(&[f64]) -> f64 + Sync,
{
    cats.par_iter_mut()
        .zip(seeds)
        .for_each(|(cat, seed)| ctx.update(cat, &mut StdRng::seed_from_u64(seed)));
}

#[cfg(not(feature = "parallel-processing"))]
fn move_cats_parallel<F>(ctx: &MoveContext<'_, F>, cats: &mut [Cat], seeds: Vec<u64>)
where
    F: Fn(&[f64]) -> f64 + Sync,
{
    move_cats(ctx, cats, seeds);
}

/// Evaluate the objective, treating NaN as the worst possible score.
fn score<F: Fn(&[f64]) -> f64>(objective: &F, position: &[f64]) -> f64 {
    let value = objective(position);
    if value.is_nan() { f64::INFINITY } else { value }
}

/// Replace the global best if this iteration's best cat improves on it.
fn update_global_best(state: &mut SwarmState) {
    let iteration_best = state
        .cats
        .iter()
        .min_by(|a, b| a.fitness.total_cmp(&b.fitness));

    if let Some(cat) = iteration_best {
        if cat.fitness < state.best_score {
            state.best_score = cat.fitness;
            state.best_position = cat.position.clone();
        }
    }
}
