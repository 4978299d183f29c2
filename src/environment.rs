//! Factory environment: spawning, agent execution, lifecycle, and episode
//! control.
//!
//! One tick runs in a fixed order so that two runs with the same seed and
//! action sequence produce identical trajectories:
//! spawn -> agents in registration order -> station service -> termination
//! check -> metrics. All waiting is modeled as timers compared against
//! simulated time; nothing blocks.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::agent::Agent;
use crate::config::FactoryConfig;
use crate::error::FactoryError;
use crate::layout::FactoryLayout;
use crate::metrics::{self, MetricsSnapshot, TelemetrySink};
use crate::observation::ObservationBuilder;
use crate::product::{Product, ProductState};
use crate::reward::{self, RewardShaper};
use crate::types::{AgentAction, AgentTask, TaskAction, TerminationReason};
use crate::Id;

/// Result of a single environment step.
#[derive(Debug, Clone)]
pub struct StepResult {
    /// Per-agent observations after the step, in registration order.
    pub observations: Vec<Vec<f64>>,
    /// Per-agent reward for this tick (sum of all shaping terms).
    pub rewards: Vec<f64>,
    /// Whether the episode has ended.
    pub done: bool,
    /// Why the episode ended, if it did.
    pub termination: Option<TerminationReason>,
    /// Tick index after the step.
    pub tick: u32,
    /// Products currently in the active set.
    pub active_products: usize,
    /// Coarse anomaly flag after the step.
    pub anomaly: bool,
}

/// The factory floor environment.
///
/// Owns the product set, the registered agents, the layout registries, and
/// the episode clock. Agents hold non-owning product IDs back into the
/// environment's product table.
///
/// # Lifecycle
///
/// 1. Build a [`FactoryLayout`] and validate a [`FactoryConfig`] via
///    [`FactoryEnv::new`] (configuration problems fail fast).
/// 2. Register agents; registration order is execution order.
/// 3. Call [`FactoryEnv::reset`] to start an episode.
/// 4. Repeatedly call [`FactoryEnv::step`] with one action per agent until
///    `done`, then reset again.
pub struct FactoryEnv {
    /// Environment configuration.
    pub config: FactoryConfig,
    /// Station, belt, and region registries.
    pub layout: FactoryLayout,
    agents: Vec<Agent>,
    /// Active products, in spawn order. Carried products stay in this set
    /// until delivered or destroyed.
    products: Vec<Product>,
    rng: StdRng,
    seed: u64,
    tick_count: u32,
    sim_time: f64,
    spawn_timer: f64,
    metrics_timer: f64,
    completion_times: Vec<f64>,
    mean_completion_time: f64,
    completed_count: u32,
    overall_efficiency: f64,
    terminated: Option<TerminationReason>,
    reset_requested: bool,
    sink: Option<Box<dyn TelemetrySink>>,
}

impl FactoryEnv {
    /// Creates an environment, validating configuration and layout.
    pub fn new(config: FactoryConfig, layout: FactoryLayout, seed: u64) -> Result<Self, FactoryError> {
        config.validate()?;
        layout.validate()?;
        Ok(Self {
            config,
            layout,
            agents: Vec::new(),
            products: Vec::new(),
            rng: StdRng::seed_from_u64(seed),
            seed,
            tick_count: 0,
            sim_time: 0.0,
            spawn_timer: 0.0,
            metrics_timer: 0.0,
            completion_times: Vec::new(),
            mean_completion_time: 0.0,
            completed_count: 0,
            overall_efficiency: 0.0,
            terminated: None,
            reset_requested: false,
            sink: None,
        })
    }

    /// Registers an agent. Registration order fixes execution order and
    /// breaks pickup ties (earlier agents claim contested products first).
    pub fn register_agent(&mut self, agent: Agent) {
        self.agents.push(agent);
    }

    /// Installs the telemetry sink that receives metrics snapshots.
    pub fn set_telemetry_sink(&mut self, sink: Box<dyn TelemetrySink>) {
        self.sink = Some(sink);
    }

    /// Registered agents, in registration order.
    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    /// Active products (available + carried + processed).
    pub fn active_products(&self) -> &[Product] {
        &self.products
    }

    /// Products completed this episode.
    pub fn total_products_completed(&self) -> u32 {
        self.completed_count
    }

    /// Running mean completion time in simulated seconds.
    pub fn average_completion_time(&self) -> f64 {
        self.mean_completion_time
    }

    /// Overall efficiency in `[0, 100]`.
    pub fn overall_efficiency(&self) -> f64 {
        self.overall_efficiency
    }

    /// Current tick index.
    pub fn tick_count(&self) -> u32 {
        self.tick_count
    }

    /// Elapsed simulated seconds this episode.
    pub fn sim_time(&self) -> f64 {
        self.sim_time
    }

    /// Requests a global reset. The reset is applied atomically at the top
    /// of the next [`step`](FactoryEnv::step), never mid-tick, so callers
    /// outside any single agent's episode boundary can trigger it safely.
    pub fn request_reset(&mut self) {
        self.reset_requested = true;
    }

    /// Resets the environment for a new episode and returns the initial
    /// per-agent observations.
    ///
    /// Destroys all active products (the only path besides delivery that
    /// may discard them), zeroes metrics and the episode clock, resets
    /// every station and belt, and restores every agent to its spawn pose.
    pub fn reset(&mut self) -> Vec<Vec<f64>> {
        self.rng = StdRng::seed_from_u64(self.seed);
        self.seed += 1; // variation across episodes, reproducible from t0
        self.products.clear();
        self.tick_count = 0;
        self.sim_time = 0.0;
        self.spawn_timer = 0.0;
        self.metrics_timer = 0.0;
        self.completion_times.clear();
        self.mean_completion_time = 0.0;
        self.completed_count = 0;
        self.overall_efficiency = 0.0;
        self.terminated = None;
        self.reset_requested = false;

        self.layout.reset();
        for agent in &mut self.agents {
            // Carried products were already dropped with the product set.
            let _ = agent.begin_episode();
        }

        ObservationBuilder::build_all(&self.agents, &self.layout, &self.config)
    }

    /// Executes one simulation tick.
    ///
    /// `actions` is matched to agents by registration order; a missing
    /// action (late or absent decision source) defaults to `Continue` with
    /// zero movement. Once the episode has ended, further calls are no-ops
    /// that keep reporting `done` until [`reset`](FactoryEnv::reset).
    pub fn step(&mut self, actions: &[AgentAction]) -> StepResult {
        if self.reset_requested {
            self.reset();
        }
        if self.terminated.is_some() {
            return self.result(vec![0.0; self.agents.len()]);
        }

        self.tick_count += 1;
        self.sim_time += self.config.delta_t;

        // 1. Spawn phase
        self.advance_spawner();

        // 2. Agent phase, in registration order
        let mut rewards = vec![0.0; self.agents.len()];
        for i in 0..self.agents.len() {
            let action = actions.get(i).copied().unwrap_or_default();
            rewards[i] = self.step_agent(i, &action);
            if self.terminated.is_some() {
                // Hazard ends the episode immediately; later agents do not
                // act this tick.
                break;
            }
        }

        // 3. Station service
        for station in &mut self.layout.processing_stations {
            station.tick(self.config.delta_t);
        }

        // 4. Budget termination (no penalty)
        if self.terminated.is_none() && self.tick_count >= self.config.max_steps {
            self.terminated = Some(TerminationReason::BudgetExhausted);
        }

        // 5. Global metrics
        self.recompute_efficiency();
        self.advance_metrics_clock();

        self.result(rewards)
    }

    fn result(&self, rewards: Vec<f64>) -> StepResult {
        StepResult {
            observations: ObservationBuilder::build_all(&self.agents, &self.layout, &self.config),
            rewards,
            done: self.terminated.is_some(),
            termination: self.terminated,
            tick: self.tick_count,
            active_products: self.products.len(),
            anomaly: metrics::detect_anomalies(
                self.overall_efficiency,
                &self.agents,
                &self.layout,
            ),
        }
    }

    /// Advances the spawn timer, introducing at most one product per
    /// elapsed spawn interval, gated by the active-product cap.
    fn advance_spawner(&mut self) {
        self.spawn_timer += self.config.delta_t;
        if self.spawn_timer < self.config.product_spawn_interval {
            return;
        }
        self.spawn_timer -= self.config.product_spawn_interval;
        if self.products.len() >= self.config.max_products {
            // Suppressed, not deferred: the interval's spawn is lost.
            return;
        }
        let point = self.config.spawn_points[self.rng.gen_range(0..self.config.spawn_points.len())];
        let product = Product::spawn(&mut self.rng, point, self.sim_time);
        log::debug!("spawned {} {} at {}", product.product_type, product.id, point);
        self.products.push(product);
    }

    /// Runs movement, terrain checks, the task action, and shaping for one
    /// agent. Returns the agent's total reward for the tick.
    fn step_agent(&mut self, idx: usize, action: &AgentAction) -> f64 {
        let mut delta = 0.0;

        {
            let agent = &mut self.agents[idx];
            agent.step_count += 1;
            agent.apply_movement(action, &self.config);
        }

        // Carried product follows its owner.
        if let Some(pid) = self.agents[idx].carried_product().cloned() {
            let pos = self.agents[idx].position;
            if let Some(product) = self.products.iter_mut().find(|p| p.id == pid) {
                product.position = pos;
            }
        }

        let position = self.agents[idx].position;
        if self.layout.in_hazard(&position) {
            delta += reward::HAZARD_PENALTY;
            self.terminated = Some(TerminationReason::Hazard);
            self.agents[idx].add_reward(delta);
            return delta;
        }
        if self.layout.in_obstacle(&position) {
            delta += reward::OBSTACLE_PENALTY;
        }

        delta += self.execute_task(idx, action.task);

        let nearest = self.layout.nearest_workstation_distance(&position);
        let speed = self.agents[idx].speed();
        delta += RewardShaper::shaping(&self.config, self.agents[idx].step_count, nearest, speed);

        let agent = &mut self.agents[idx];
        agent.add_reward(delta);
        agent.update_efficiency_score();
        delta
    }

    /// Executes the discrete task action for one agent and returns its
    /// reward delta.
    fn execute_task(&mut self, idx: usize, task: TaskAction) -> f64 {
        match task {
            TaskAction::Continue => 0.0,
            TaskAction::Pickup => self.try_pickup(idx),
            TaskAction::Deliver => self.try_deliver(idx),
            TaskAction::Process => self.try_process(idx),
            TaskAction::QualityCheck => self.try_quality_check(idx),
        }
    }

    fn try_pickup(&mut self, idx: usize) -> f64 {
        self.agents[idx].current_task = AgentTask::Pickup;
        if self.agents[idx].is_carrying() {
            return reward::PICKUP_WHILE_CARRYING;
        }
        let position = self.agents[idx].position;
        let radius = self.config.pickup_radius;
        // First available product in spawn order within the pickup radius.
        // Products claimed by earlier agents this tick are Carried and no
        // longer available, which serializes contested claims.
        let candidate = self
            .products
            .iter_mut()
            .find(|p| p.is_available() && p.position.distance_to(&position) <= radius);
        match candidate {
            Some(product) => {
                product.state = ProductState::Carried;
                product.position = position;
                let pid = product.id.clone();
                self.agents[idx].pick_up(pid);
                reward::PICKUP_SUCCESS
            }
            None => 0.0,
        }
    }

    fn try_deliver(&mut self, idx: usize) -> f64 {
        self.agents[idx].current_task = AgentTask::Deliver;
        let Some(pid) = self.agents[idx].carried_product().cloned() else {
            return reward::DELIVER_NOT_CARRYING;
        };
        let position = self.agents[idx].position;
        let in_range = self
            .layout
            .delivery_stations_in_range(&position, self.config.station_radius);

        let Some(product_idx) = self.products.iter().position(|p| p.id == pid) else {
            // Ownership points at a product already gone; treat as carrying
            // with no acceptor.
            return reward::DELIVER_NO_STATION;
        };

        for station_idx in in_range {
            if self.layout.delivery_stations[station_idx].accepts(&self.products[product_idx]) {
                let completion_time = self.products[product_idx].completion_time(self.sim_time);
                self.agents[idx].release_product();
                self.agents[idx].products_completed += 1;
                self.on_product_completed(&pid, completion_time);
                return reward::DELIVER_SUCCESS;
            }
        }
        reward::DELIVER_NO_STATION
    }

    fn try_process(&mut self, idx: usize) -> f64 {
        self.agents[idx].current_task = AgentTask::Process;
        // Failed processing is a silent no-op: no penalty, unlike the other
        // task failures. Intentional, preserved as-is.
        let Some(pid) = self.agents[idx].carried_product().cloned() else {
            return 0.0;
        };
        let position = self.agents[idx].position;
        let in_range = self
            .layout
            .processing_stations_in_range(&position, self.config.station_radius);
        let Some(product) = self.products.iter_mut().find(|p| p.id == pid) else {
            return 0.0;
        };
        for station_idx in in_range {
            if self.layout.processing_stations[station_idx].try_process(product) {
                return reward::PROCESS_SUCCESS;
            }
        }
        0.0
    }

    fn try_quality_check(&mut self, idx: usize) -> f64 {
        self.agents[idx].current_task = AgentTask::QualityCheck;
        let Some(pid) = self.agents[idx].carried_product().cloned() else {
            return 0.0;
        };
        let Some(product) = self.products.iter_mut().find(|p| p.id == pid) else {
            return 0.0;
        };
        if product.passes_quality_check() {
            product.state = ProductState::QualityChecked;
            reward::QUALITY_PASS
        } else {
            reward::QUALITY_FAIL
        }
    }

    /// Records a product completion: removes it from the active set,
    /// appends the completion time to history, updates the running mean,
    /// and recomputes efficiency.
    ///
    /// Idempotent: a product not currently active is a no-op, tolerating
    /// at-least-once delivery of completion signals from upstream.
    pub fn on_product_completed(&mut self, product_id: &Id, completion_time: f64) {
        let Some(pos) = self.products.iter().position(|p| &p.id == product_id) else {
            return;
        };
        let mut product = self.products.remove(pos);
        product.state = ProductState::Delivered;
        for agent in &mut self.agents {
            if agent.carried_product() == Some(product_id) {
                agent.release_product();
            }
        }
        self.completed_count += 1;
        self.completion_times.push(completion_time);
        self.mean_completion_time =
            self.completion_times.iter().sum::<f64>() / self.completion_times.len() as f64;
        log::debug!(
            "completed {} in {:.1}s ({} total)",
            product.id,
            completion_time,
            self.completed_count
        );
        self.recompute_efficiency();
    }

    /// Recomputes overall efficiency: completion rate against the target
    /// rate implied by the spawn interval, averaged 50/50 with the mean
    /// per-agent efficiency score, clamped to `[0, 100]`.
    fn recompute_efficiency(&mut self) {
        let elapsed_minutes = self.sim_time / 60.0;
        let actual_rate = if elapsed_minutes > 0.0 {
            self.completed_count as f64 / elapsed_minutes
        } else {
            0.0
        };
        let target_rate = self.config.target_rate_per_minute();
        let mut efficiency = (actual_rate / target_rate * 100.0).clamp(0.0, 100.0);

        if !self.agents.is_empty() {
            let mean_agent_score = self
                .agents
                .iter()
                .map(|a| a.efficiency_score)
                .sum::<f64>()
                / self.agents.len() as f64;
            // Agent scores are throughput rates and can exceed 100, so the
            // blended value is clamped to keep the [0, 100] invariant.
            efficiency = ((efficiency + mean_agent_score) / 2.0).clamp(0.0, 100.0);
        }
        self.overall_efficiency = efficiency;
    }

    /// Coarse anomaly signal over current aggregate state.
    pub fn detect_anomalies(&self) -> bool {
        metrics::detect_anomalies(self.overall_efficiency, &self.agents, &self.layout)
    }

    /// Current aggregate state as a snapshot record.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            efficiency: self.overall_efficiency,
            total_products_completed: self.completed_count,
            average_completion_time: self.mean_completion_time,
            active_agent_count: self.agents.len(),
            active_product_count: self.products.len(),
            timestamp: self.sim_time,
        }
    }

    /// Emits a snapshot to the sink once per metrics interval of simulated
    /// time. Emission is by value and never waits on the sink.
    fn advance_metrics_clock(&mut self) {
        self.metrics_timer += self.config.delta_t;
        if self.metrics_timer < self.config.metrics_interval {
            return;
        }
        self.metrics_timer -= self.config.metrics_interval;
        let snapshot = self.metrics_snapshot();
        if let Some(sink) = self.sink.as_mut() {
            sink.emit(snapshot);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::Region;
    use crate::station::{ConveyorBelt, DeliveryStation, ProcessingStation};
    use crate::types::Vec3;

    fn basic_layout() -> FactoryLayout {
        let mut layout = FactoryLayout::new();
        layout
            .add_processing_station(ProcessingStation::new(
                "proc".into(),
                Vec3::new(5.0, 0.0, 0.0),
                8,
                3.0,
            ))
            .unwrap();
        layout
            .add_delivery_station(DeliveryStation::new("out".into(), Vec3::new(0.0, 0.0, 5.0)))
            .unwrap();
        layout.add_belt(ConveyorBelt::new("belt".into()));
        layout
    }

    /// Config with a single spawn point at the origin so an agent standing
    /// there can always pick up.
    fn origin_spawn_config() -> FactoryConfig {
        FactoryConfig {
            spawn_points: vec![Vec3::origin()],
            product_spawn_interval: 1.0,
            delta_t: 1.0,
            max_steps: 100,
            ..FactoryConfig::default()
        }
    }

    fn make_env() -> FactoryEnv {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut env = FactoryEnv::new(origin_spawn_config(), basic_layout(), 42).unwrap();
        env.register_agent(Agent::new("a0".into(), Vec3::origin()));
        env
    }

    fn continue_actions(n: usize) -> Vec<AgentAction> {
        vec![AgentAction::default(); n]
    }

    fn task_only(task: TaskAction) -> Vec<AgentAction> {
        vec![AgentAction {
            task,
            ..AgentAction::default()
        }]
    }

    #[test]
    fn construction_validates_config_and_layout() {
        let bad_config = FactoryConfig {
            max_products: 0,
            ..FactoryConfig::default()
        };
        assert!(FactoryEnv::new(bad_config, basic_layout(), 0).is_err());
        assert!(FactoryEnv::new(FactoryConfig::default(), FactoryLayout::new(), 0).is_err());
    }

    #[test]
    fn active_products_never_exceed_cap() {
        let config = FactoryConfig {
            max_products: 3,
            ..origin_spawn_config()
        };
        let mut env = FactoryEnv::new(config, basic_layout(), 7).unwrap();
        env.register_agent(Agent::new("a0".into(), Vec3::new(50.0, 0.0, 50.0)));
        env.reset();
        for _ in 0..50 {
            let result = env.step(&continue_actions(1));
            assert!(result.active_products <= 3);
        }
    }

    #[test]
    fn second_spawn_suppressed_when_cap_is_one() {
        let config = FactoryConfig {
            max_products: 1,
            ..origin_spawn_config()
        };
        // Agent far away so nothing gets picked up.
        let mut env = FactoryEnv::new(config, basic_layout(), 7).unwrap();
        env.register_agent(Agent::new("a0".into(), Vec3::new(50.0, 0.0, 50.0)));
        env.reset();
        // Two spawn intervals elapse; exactly one product may exist.
        env.step(&continue_actions(1));
        let result = env.step(&continue_actions(1));
        assert_eq!(result.active_products, 1);
    }

    #[test]
    fn pickup_transitions_product_and_rewards() {
        let mut env = make_env();
        env.reset();
        env.step(&continue_actions(1)); // spawn interval elapses at origin
        let result = env.step(&task_only(TaskAction::Pickup));
        assert!((result.rewards[0] - reward::PICKUP_SUCCESS).abs() < 0.05);
        assert!(env.agents()[0].is_carrying());
        assert_eq!(env.active_products()[0].state, ProductState::Carried);
    }

    #[test]
    fn pickup_while_carrying_penalized_without_state_change() {
        let mut env = make_env();
        env.reset();
        env.step(&continue_actions(1));
        env.step(&task_only(TaskAction::Pickup));
        let carried = env.agents()[0].carried_product().cloned();
        let result = env.step(&task_only(TaskAction::Pickup));
        assert!(result.rewards[0] < 0.0);
        assert_eq!(env.agents()[0].carried_product().cloned(), carried);
    }

    #[test]
    fn deliver_not_carrying_penalty_is_five_hundredths() {
        let mut env = make_env();
        env.reset();
        // Isolate the task delta from shaping by computing both.
        let agent_pos = env.agents()[0].position;
        let nearest = env.layout.nearest_workstation_distance(&agent_pos);
        let shaping = RewardShaper::shaping(&env.config, 1, nearest, 0.0);
        let result = env.step(&task_only(TaskAction::Deliver));
        assert!((result.rewards[0] - (reward::DELIVER_NOT_CARRYING + shaping)).abs() < 1e-9);
        // No product state changed.
        assert!(env.active_products().iter().all(|p| p.is_available()));
    }

    #[test]
    fn deliver_in_range_completes_product() {
        let mut env = make_env();
        env.reset();
        env.step(&continue_actions(1));
        env.step(&task_only(TaskAction::Pickup));
        assert!(env.agents()[0].is_carrying());

        // Teleport the agent next to the delivery station (within 3 units).
        env.agents[0].position = Vec3::new(0.0, 0.0, 4.0);
        let pid = env.agents()[0].carried_product().unwrap().clone();
        let before = env.total_products_completed();
        let result = env.step(&task_only(TaskAction::Deliver));
        assert!(result.rewards[0] > 0.9);
        assert_eq!(env.total_products_completed(), before + 1);
        assert_eq!(env.agents()[0].products_completed, 1);
        assert!(!env.agents()[0].is_carrying());
        // The delivered product left the active set.
        assert!(env.active_products().iter().all(|p| p.id != pid));
    }

    #[test]
    fn process_failure_is_silent() {
        let mut env = make_env();
        env.reset();
        // Not carrying: Process must neither reward nor penalize.
        let agent_pos = env.agents()[0].position;
        let nearest = env.layout.nearest_workstation_distance(&agent_pos);
        let shaping = RewardShaper::shaping(&env.config, 1, nearest, 0.0);
        let result = env.step(&task_only(TaskAction::Process));
        assert!((result.rewards[0] - shaping).abs() < 1e-9);
    }

    #[test]
    fn process_in_range_rewards_and_queues() {
        let mut env = make_env();
        env.reset();
        env.step(&continue_actions(1));
        env.step(&task_only(TaskAction::Pickup));
        env.agents[0].position = Vec3::new(4.0, 0.0, 0.0); // within 3 of proc
        let result = env.step(&task_only(TaskAction::Process));
        assert!(result.rewards[0] > 0.4);
        assert_eq!(env.layout.processing_stations[0].queue_len(), 1);
        let pid = env.agents()[0].carried_product().unwrap().clone();
        let product = env.active_products().iter().find(|p| p.id == pid).unwrap();
        assert_eq!(product.state, ProductState::Processed);
    }

    #[test]
    fn quality_check_pass_or_fail_reward() {
        let mut env = make_env();
        env.reset();
        env.step(&continue_actions(1));
        env.step(&task_only(TaskAction::Pickup));
        let pid = env.agents()[0].carried_product().unwrap().clone();
        // Force a known quality so the branch is deterministic.
        env.products.iter_mut().find(|p| p.id == pid).unwrap().quality = 0.9;
        let result = env.step(&task_only(TaskAction::QualityCheck));
        assert!(result.rewards[0] > 0.2);

        env.products.iter_mut().find(|p| p.id == pid).unwrap().quality = 0.0;
        let result = env.step(&task_only(TaskAction::QualityCheck));
        assert!(result.rewards[0] < -0.1);
    }

    #[test]
    fn hazard_terminates_with_fixed_penalty() {
        let mut layout = basic_layout();
        layout.add_hazard(Region::new(Vec3::new(0.0, 0.0, -3.0), 1.0));
        let mut env = FactoryEnv::new(origin_spawn_config(), layout, 1).unwrap();
        // Spawn outside the region; one tick of -z movement enters it.
        env.register_agent(Agent::new("a0".into(), Vec3::new(0.0, 0.0, -1.5)));
        env.reset();
        let action = AgentAction {
            move_z: -0.2,
            ..AgentAction::default()
        };
        let result = env.step(&[action]);
        assert!(result.done);
        assert_eq!(result.termination, Some(TerminationReason::Hazard));
        assert!((result.rewards[0] - reward::HAZARD_PENALTY).abs() < 1e-9);
    }

    #[test]
    fn budget_exhaustion_is_truncation_not_hazard() {
        let config = FactoryConfig {
            max_steps: 3,
            ..origin_spawn_config()
        };
        let mut env = FactoryEnv::new(config, basic_layout(), 1).unwrap();
        env.register_agent(Agent::new("a0".into(), Vec3::origin()));
        env.reset();
        env.step(&continue_actions(1));
        env.step(&continue_actions(1));
        let result = env.step(&continue_actions(1));
        assert!(result.done);
        assert_eq!(result.termination, Some(TerminationReason::BudgetExhausted));
    }

    #[test]
    fn obstacle_penalizes_without_terminating() {
        let mut layout = basic_layout();
        layout.add_obstacle(Region::new(Vec3::new(0.0, 0.0, -3.0), 1.0));
        let mut env = FactoryEnv::new(origin_spawn_config(), layout, 1).unwrap();
        env.register_agent(Agent::new("a0".into(), Vec3::new(0.0, 0.0, -1.5)));
        env.reset();
        let action = AgentAction {
            move_z: -0.2,
            ..AgentAction::default()
        };
        let result = env.step(&[action]);
        assert!(!result.done);
        assert!(result.rewards[0] < 0.0);
    }

    #[test]
    fn missing_actions_default_to_continue() {
        let mut env = make_env();
        env.register_agent(Agent::new("a1".into(), Vec3::new(20.0, 0.0, 20.0)));
        env.reset();
        // Only one action supplied for two agents.
        let result = env.step(&task_only(TaskAction::Continue));
        assert_eq!(result.rewards.len(), 2);
        assert!(!result.done);
    }

    #[test]
    fn duplicate_completion_signal_is_noop() {
        let mut env = make_env();
        env.reset();
        env.step(&continue_actions(1));
        let pid = env.active_products()[0].id.clone();
        env.on_product_completed(&pid, 3.0);
        assert_eq!(env.total_products_completed(), 1);
        env.on_product_completed(&pid, 3.0);
        assert_eq!(env.total_products_completed(), 1);
        assert!((env.average_completion_time() - 3.0).abs() < 1e-10);
    }

    #[test]
    fn completion_signal_releases_carrying_agent() {
        let mut env = make_env();
        env.reset();
        env.step(&continue_actions(1));
        env.step(&task_only(TaskAction::Pickup));
        let pid = env.agents()[0].carried_product().unwrap().clone();

        // Upstream reports the carried product as completed: the agent's
        // handle must be released along with the product itself.
        env.on_product_completed(&pid, 2.0);
        assert!(!env.agents()[0].is_carrying());
        assert!(env.active_products().iter().all(|p| p.id != pid));

        // The freed agent can pick up the next spawn at full reward.
        env.step(&continue_actions(1));
        let result = env.step(&task_only(TaskAction::Pickup));
        assert!((result.rewards[0] - reward::PICKUP_SUCCESS).abs() < 0.05);
        assert!(env.agents()[0].is_carrying());
    }

    #[test]
    fn efficiency_stays_in_bounds_under_extremes() {
        let mut env = make_env();
        env.reset();
        assert!((0.0..=100.0).contains(&env.overall_efficiency()));
        // Huge completion count against tiny elapsed time.
        env.step(&continue_actions(1));
        for _ in 0..500 {
            let pid = env
                .active_products()
                .first()
                .map(|p| p.id.clone());
            if let Some(pid) = pid {
                env.on_product_completed(&pid, 0.1);
            }
            env.step(&continue_actions(1));
            let eff = env.overall_efficiency();
            assert!((0.0..=100.0).contains(&eff), "efficiency {eff} out of range");
        }
    }

    #[test]
    fn reset_mid_episode_clears_everything() {
        let mut env = make_env();
        env.reset();
        for _ in 0..5 {
            env.step(&continue_actions(1));
        }
        env.step(&task_only(TaskAction::Pickup));
        assert!(!env.active_products().is_empty());
        let pid = env
            .active_products()
            .iter()
            .find(|p| p.is_available())
            .unwrap()
            .id
            .clone();
        env.on_product_completed(&pid, 2.0);
        assert_eq!(env.total_products_completed(), 1);

        env.reset();
        assert!(env.active_products().is_empty());
        assert_eq!(env.total_products_completed(), 0);
        assert_eq!(env.overall_efficiency(), 0.0);
        assert_eq!(env.average_completion_time(), 0.0);
        assert_eq!(env.layout.processing_stations[0].queue_len(), 0);
        assert!(!env.agents()[0].is_carrying());
        assert_eq!(env.tick_count(), 0);
    }

    #[test]
    fn requested_reset_applies_at_next_step() {
        let mut env = make_env();
        env.reset();
        for _ in 0..4 {
            env.step(&continue_actions(1));
        }
        env.request_reset();
        let result = env.step(&continue_actions(1));
        // The reset ran first, then one fresh tick.
        assert_eq!(result.tick, 1);
        assert_eq!(env.total_products_completed(), 0);
    }

    #[test]
    fn identical_seeds_and_actions_reproduce_rewards() {
        let run = || {
            let mut env = make_env();
            env.reset();
            let mut total = 0.0;
            let script = [
                TaskAction::Continue,
                TaskAction::Pickup,
                TaskAction::Deliver,
                TaskAction::Pickup,
                TaskAction::QualityCheck,
                TaskAction::Continue,
            ];
            for task in script {
                let result = env.step(&task_only(task));
                total += result.rewards[0];
            }
            total
        };
        // Bit-identical cumulative reward across runs.
        assert_eq!(run().to_bits(), run().to_bits());
    }

    #[test]
    fn carrying_flag_matches_ownership_through_sequences() {
        let mut env = make_env();
        env.reset();
        let script = [
            TaskAction::Pickup,
            TaskAction::Continue,
            TaskAction::Pickup,
            TaskAction::Process,
            TaskAction::QualityCheck,
            TaskAction::Deliver,
            TaskAction::Pickup,
        ];
        for task in script {
            env.step(&task_only(task));
            let agent = &env.agents()[0];
            assert_eq!(agent.is_carrying(), agent.carried_product().is_some());
            if let Some(pid) = agent.carried_product() {
                let product = env.active_products().iter().find(|p| &p.id == pid);
                assert!(product.is_some_and(|p| p.is_owned()));
            }
        }
    }

    #[test]
    fn contested_pickup_goes_to_first_registered_agent() {
        let config = FactoryConfig {
            max_products: 1,
            ..origin_spawn_config()
        };
        let mut env = FactoryEnv::new(config, basic_layout(), 3).unwrap();
        env.register_agent(Agent::new("first".into(), Vec3::origin()));
        env.register_agent(Agent::new("second".into(), Vec3::origin()));
        env.reset();
        env.step(&continue_actions(2));
        let pickup = AgentAction {
            task: TaskAction::Pickup,
            ..AgentAction::default()
        };
        env.step(&[pickup, pickup]);
        assert!(env.agents()[0].is_carrying());
        assert!(!env.agents()[1].is_carrying());
    }

    #[test]
    fn telemetry_emitted_on_cadence() {
        use crate::metrics::MemorySink;
        use std::cell::RefCell;
        use std::rc::Rc;

        // Shared handle so the sink can be inspected after installation.
        struct SharedSink(Rc<RefCell<MemorySink>>);
        impl TelemetrySink for SharedSink {
            fn emit(&mut self, snapshot: MetricsSnapshot) {
                self.0.borrow_mut().emit(snapshot);
            }
        }

        let sink = Rc::new(RefCell::new(MemorySink::new()));
        let config = FactoryConfig {
            metrics_interval: 2.0,
            ..origin_spawn_config()
        };
        let mut env = FactoryEnv::new(config, basic_layout(), 1).unwrap();
        env.register_agent(Agent::new("a0".into(), Vec3::new(30.0, 0.0, 30.0)));
        env.set_telemetry_sink(Box::new(SharedSink(Rc::clone(&sink))));
        env.reset();
        for _ in 0..10 {
            env.step(&continue_actions(1));
        }
        // delta_t = 1.0, interval = 2.0: one snapshot every two ticks.
        assert_eq!(sink.borrow().snapshots.len(), 5);
        let last = sink.borrow().snapshots.last().cloned().unwrap();
        assert_eq!(last.active_agent_count, 1);
        assert!((last.timestamp - 10.0).abs() < 1e-9);
    }
}
