//! Simulation clock and run lifecycle.

use crate::engine::CableEngine;
use ballstick_core::{CableError, Result, SimulationParams, Time};
use serde::Serialize;
use tracing::{debug, info};

/// Lifecycle of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunState {
    /// Not initialized yet
    Idle,
    /// Initialized, time can advance
    Running,
    /// Finished; traces are final
    Stopped,
}

/// Simulation clock handed to the engine explicitly
#[derive(Debug, Clone)]
pub struct SimulationContext {
    params: SimulationParams,
    t: Time,
    steps: u64,
    state: RunState,
}

impl SimulationContext {
    pub fn new(params: SimulationParams) -> Self {
        Self {
            params,
            t: 0.0,
            steps: 0,
            state: RunState::Idle,
        }
    }

    pub fn params(&self) -> &SimulationParams {
        &self.params
    }

    /// Current time (ms)
    pub fn t(&self) -> Time {
        self.t
    }

    /// Steps taken since the last start
    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Initialize the engine at `v_init` and start the clock at 0
    pub fn start<E: CableEngine>(&mut self, engine: &mut E) -> Result<()> {
        if self.state == RunState::Running {
            return Err(CableError::Simulation("simulation already running".into()));
        }
        if !(self.params.dt.is_finite() && self.params.dt > 0.0) {
            return Err(CableError::Simulation(format!(
                "dt must be finite and positive, got {}",
                self.params.dt
            )));
        }
        check_tstop(self.params.tstop)?;
        engine.finitialize(&self.params)?;
        self.t = 0.0;
        self.steps = 0;
        self.state = RunState::Running;
        info!(
            dt = self.params.dt,
            tstop = self.params.tstop,
            v_init = self.params.v_init,
            "simulation started"
        );
        Ok(())
    }

    /// Advance one time step
    pub fn advance<E: CableEngine>(&mut self, engine: &mut E) -> Result<()> {
        if self.state != RunState::Running {
            return Err(CableError::Simulation(format!(
                "cannot advance a simulation in state {:?}",
                self.state
            )));
        }
        self.steps += 1;
        self.t = self.steps as f64 * self.params.dt;
        engine.fadvance(self.t)
    }

    /// Run from the current state to `tstop`, then stop
    pub fn run<E: CableEngine>(&mut self, engine: &mut E) -> Result<()> {
        if self.state != RunState::Running {
            self.start(engine)?;
        }
        while self.t + 0.5 * self.params.dt <= self.params.tstop {
            self.advance(engine)?;
        }
        debug!(steps = self.steps, t = self.t, "reached tstop");
        self.stop()
    }

    /// Extend a stopped run to a new stop time without re-initializing
    pub fn continue_run<E: CableEngine>(&mut self, engine: &mut E, tstop: Time) -> Result<()> {
        if self.state == RunState::Idle {
            return Err(CableError::Simulation("simulation was never started".into()));
        }
        check_tstop(tstop)?;
        self.params.tstop = tstop;
        self.state = RunState::Running;
        self.run(engine)
    }

    /// End the run
    pub fn stop(&mut self) -> Result<()> {
        if self.state != RunState::Running {
            return Err(CableError::Simulation(format!(
                "cannot stop a simulation in state {:?}",
                self.state
            )));
        }
        self.state = RunState::Stopped;
        info!(t = self.t, "simulation stopped");
        Ok(())
    }
}

fn check_tstop(tstop: Time) -> Result<()> {
    if tstop.is_finite() {
        Ok(())
    } else {
        Err(CableError::Simulation(format!("tstop must be finite, got {}", tstop)))
    }
}

impl Default for SimulationContext {
    fn default() -> Self {
        Self::new(SimulationParams::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryEngine;

    fn params(dt: f64, tstop: f64) -> SimulationParams {
        SimulationParams {
            dt,
            tstop,
            ..Default::default()
        }
    }

    #[test]
    fn test_simulation_init() {
        let mut engine = InMemoryEngine::new();
        let mut sim = SimulationContext::default();
        assert_eq!(sim.state(), RunState::Idle);

        sim.start(&mut engine).unwrap();
        assert_eq!(sim.t(), 0.0);
        assert_eq!(sim.state(), RunState::Running);
        assert!(sim.start(&mut engine).is_err());
    }

    #[test]
    fn test_run_to_tstop() {
        let mut engine = InMemoryEngine::new();
        let mut sim = SimulationContext::new(params(0.25, 1.0));
        sim.run(&mut engine).unwrap();

        assert_eq!(sim.steps(), 4);
        assert!((sim.t() - 1.0).abs() < 1e-12);
        assert_eq!(sim.state(), RunState::Stopped);
        assert_eq!(engine.t(), sim.t());
    }

    #[test]
    fn test_advance_requires_running() {
        let mut engine = InMemoryEngine::new();
        let mut sim = SimulationContext::default();
        assert!(matches!(sim.advance(&mut engine), Err(CableError::Simulation(_))));
        assert!(sim.stop().is_err());
        assert!(sim.continue_run(&mut engine, 10.0).is_err());
    }

    #[test]
    fn test_continue_run() {
        let mut engine = InMemoryEngine::new();
        let mut sim = SimulationContext::new(params(0.5, 1.0));
        sim.run(&mut engine).unwrap();
        sim.continue_run(&mut engine, 2.0).unwrap();

        assert_eq!(sim.steps(), 4);
        assert_eq!(sim.state(), RunState::Stopped);
    }

    #[test]
    fn test_rejects_zero_dt() {
        let mut engine = InMemoryEngine::new();
        let mut sim = SimulationContext::new(params(0.0, 1.0));
        assert!(matches!(sim.run(&mut engine), Err(CableError::Simulation(_))));
        assert_eq!(sim.state(), RunState::Idle);
        assert_eq!(sim.steps(), 0);

        for dt in [-0.025, f64::NAN, f64::INFINITY] {
            let mut sim = SimulationContext::new(params(dt, 1.0));
            assert!(matches!(sim.start(&mut engine), Err(CableError::Simulation(_))));
            assert_eq!(sim.state(), RunState::Idle);
        }
    }

    #[test]
    fn test_rejects_non_finite_tstop() {
        let mut engine = InMemoryEngine::new();
        for tstop in [f64::INFINITY, f64::NAN] {
            let mut sim = SimulationContext::new(params(0.025, tstop));
            assert!(matches!(sim.run(&mut engine), Err(CableError::Simulation(_))));
            assert_eq!(sim.state(), RunState::Idle);
        }
    }

    #[test]
    fn test_continue_run_rejects_infinite_tstop() {
        let mut engine = InMemoryEngine::new();
        let mut sim = SimulationContext::new(params(0.5, 1.0));
        sim.run(&mut engine).unwrap();

        let err = sim.continue_run(&mut engine, f64::INFINITY);
        assert!(matches!(err, Err(CableError::Simulation(_))));
        assert_eq!(sim.state(), RunState::Stopped);
        assert_eq!(sim.params().tstop, 1.0);
        assert_eq!(sim.steps(), 2);
    }
}
