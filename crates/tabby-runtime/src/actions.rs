//! Leaf actions.
//!
//! Every leaf is a small timer-driven state machine.  Each tick either
//! finishes (the leaf resets itself, re-rolling its timers, and answers
//! [`NodeStatus::Success`]) or performs its side effect on the [`Body`],
//! advances its clock by [`TICK_QUANTUM`] and answers
//! [`NodeStatus::Running`].
//!
//! | Leaf             | Duration        | Side effect per tick                               |
//! |------------------|-----------------|----------------------------------------------------|
//! | [`Sleep`]        | integer 3–8     | state `sleeping`                                   |
//! | [`Play`]         | integer 2–5     | 30 %: hop by `{-2,-1,1,2}²`; state `playing`       |
//! | [`ObserveItems`] | 0.5–1.5         | state `observing`                                  |
//! | [`RandomWait`]   | 1.0–3.0         | state `waiting`                                    |
//! | [`Interact`]     | 1.0–2.0         | 20 %: shuffle by `{-1,0,1}²`; state `interacting`  |
//! | [`ObserveAndWait`] | 2.0–4.0       | state `observing_wait`                             |
//! | [`Explore`]      | 3.0–6.0         | cooldown-gated biased step; state `exploring`      |
//! | [`Wander`]       | never finishes  | cooldown-gated step; state `wandering`             |
//! | [`MoveToTarget`] | until arrival   | one step towards a random target; state `moving`   |

use rand::Rng;
use rand::rngs::StdRng;
use tabby_types::{AgentState, GridBounds, NodeStatus, Position};

use crate::behavior_tree::{Body, TICK_QUANTUM, TickContext};

/// Behavior contract shared by every leaf.
pub trait Action {
    fn tick(&mut self, ctx: &mut TickContext<'_>) -> NodeStatus;

    /// Restore progress counters and re-roll timers.
    fn reset(&mut self, rng: &mut StdRng);

    /// The agent state this leaf sets while running.
    fn state_tag(&self) -> AgentState;

    /// Single scalar tunable exposed to serialization.
    fn param(&self) -> Option<f64> {
        None
    }

    /// Overwrite the tunable.  Returns `false` if there is none.
    fn set_param(&mut self, _value: f64) -> bool {
        false
    }
}

fn pick(rng: &mut StdRng, options: &[i32]) -> i32 {
    options[rng.gen_range(0..options.len())]
}

// ─────────────────────────────────────────────────────────────────────────────
// Timer
// ─────────────────────────────────────────────────────────────────────────────

/// Elapsed/target pair used by the finite leaves.
#[derive(Debug, Clone, PartialEq)]
pub struct Timer {
    pub elapsed: f64,
    pub duration: f64,
}

impl Timer {
    fn new(duration: f64) -> Self {
        Self {
            elapsed: 0.0,
            duration,
        }
    }

    fn expired(&self) -> bool {
        self.elapsed >= self.duration
    }

    fn advance(&mut self) {
        self.elapsed += TICK_QUANTUM;
    }
}

/// Shared tick shape of the finite leaves: finish when the timer has run out,
/// otherwise run `effect`, set `state` and advance the clock.
fn run_timed<A: Action>(
    action: &mut A,
    timer: impl Fn(&mut A) -> &mut Timer,
    state: AgentState,
    ctx: &mut TickContext<'_>,
    effect: impl FnOnce(&mut A, &mut TickContext<'_>),
) -> NodeStatus {
    if timer(action).expired() {
        action.reset(ctx.rng);
        return NodeStatus::Success;
    }
    effect(action, ctx);
    ctx.body.state = state;
    timer(action).advance();
    NodeStatus::Running
}

macro_rules! timed_leaf {
    (
        $(#[$meta:meta])*
        $name:ident, $state:expr, $draw:expr, tunable = $tunable:literal
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq)]
        pub struct $name {
            pub timer: Timer,
        }

        impl $name {
            pub fn new(rng: &mut StdRng) -> Self {
                Self {
                    timer: Timer::new(($draw)(rng)),
                }
            }
        }

        impl Action for $name {
            fn tick(&mut self, ctx: &mut TickContext<'_>) -> NodeStatus {
                run_timed(self, |a| &mut a.timer, $state, ctx, |_, _| {})
            }

            fn reset(&mut self, rng: &mut StdRng) {
                self.timer = Timer::new(($draw)(rng));
            }

            fn state_tag(&self) -> AgentState {
                $state
            }

            fn param(&self) -> Option<f64> {
                $tunable.then_some(self.timer.duration)
            }

            fn set_param(&mut self, value: f64) -> bool {
                if $tunable {
                    self.timer.duration = value;
                }
                $tunable
            }
        }
    };
}

timed_leaf!(
    /// Doze for a whole number of simulated seconds.
    Sleep,
    AgentState::Sleeping,
    |rng: &mut StdRng| rng.gen_range(3..=8) as f64,
    tunable = true
);

timed_leaf!(
    /// Look around for nearby items.
    ObserveItems,
    AgentState::Observing,
    |rng: &mut StdRng| rng.gen_range(0.5..1.5),
    tunable = true
);

timed_leaf!(
    /// Idle pause between activities.
    RandomWait,
    AgentState::Waiting,
    |rng: &mut StdRng| rng.gen_range(1.0..3.0),
    tunable = true
);

timed_leaf!(
    ObserveAndWait,
    AgentState::ObservingWait,
    |rng: &mut StdRng| rng.gen_range(2.0..4.0),
    tunable = false
);

impl ObserveItems {
    /// Stretch the current observation window.
    pub fn scale_duration(&mut self, factor: f64) {
        self.timer.duration *= factor;
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Play / Interact
// ─────────────────────────────────────────────────────────────────────────────

/// Bounce around for a few seconds.
#[derive(Debug, Clone, PartialEq)]
pub struct Play {
    pub timer: Timer,
}

impl Play {
    pub fn new(rng: &mut StdRng) -> Self {
        Self {
            timer: Timer::new(rng.gen_range(2..=5) as f64),
        }
    }
}

impl Action for Play {
    fn tick(&mut self, ctx: &mut TickContext<'_>) -> NodeStatus {
        run_timed(self, |a| &mut a.timer, AgentState::Playing, ctx, |_, ctx| {
            if ctx.rng.gen_bool(0.3) {
                let dx = pick(ctx.rng, &[-2, -1, 1, 2]);
                let dy = pick(ctx.rng, &[-2, -1, 1, 2]);
                ctx.body.step(dx, dy);
            }
        })
    }

    fn reset(&mut self, rng: &mut StdRng) {
        *self = Self::new(rng);
    }

    fn state_tag(&self) -> AgentState {
        AgentState::Playing
    }

    fn param(&self) -> Option<f64> {
        Some(self.timer.duration)
    }

    fn set_param(&mut self, value: f64) -> bool {
        self.timer.duration = value;
        true
    }
}

/// Fiddle with something nearby, occasionally shuffling a cell.
#[derive(Debug, Clone, PartialEq)]
pub struct Interact {
    pub timer: Timer,
}

impl Interact {
    pub fn new(rng: &mut StdRng) -> Self {
        Self {
            timer: Timer::new(rng.gen_range(1.0..2.0)),
        }
    }
}

impl Action for Interact {
    fn tick(&mut self, ctx: &mut TickContext<'_>) -> NodeStatus {
        run_timed(self, |a| &mut a.timer, AgentState::Interacting, ctx, |_, ctx| {
            if ctx.rng.gen_bool(0.2) {
                let dx = pick(ctx.rng, &[-1, 0, 1]);
                let dy = pick(ctx.rng, &[-1, 0, 1]);
                ctx.body.step(dx, dy);
            }
        })
    }

    fn reset(&mut self, rng: &mut StdRng) {
        *self = Self::new(rng);
    }

    fn state_tag(&self) -> AgentState {
        AgentState::Interacting
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Explore / Wander
// ─────────────────────────────────────────────────────────────────────────────

/// Roam with a horizontal bias for a few seconds.
#[derive(Debug, Clone, PartialEq)]
pub struct Explore {
    pub timer: Timer,
    pub move_cooldown: f64,
}

impl Explore {
    pub fn new(rng: &mut StdRng) -> Self {
        Self {
            timer: Timer::new(rng.gen_range(3.0..6.0)),
            move_cooldown: 0.0,
        }
    }
}

impl Action for Explore {
    fn tick(&mut self, ctx: &mut TickContext<'_>) -> NodeStatus {
        run_timed(self, |a| &mut a.timer, AgentState::Exploring, ctx, |a, ctx| {
            if a.move_cooldown <= 0.0 {
                let dx = pick(ctx.rng, &[-1, -1, 0, 1, 1]);
                let dy = pick(ctx.rng, &[-1, 0, 0, 1]);
                ctx.body.step(dx, dy);
                a.move_cooldown = ctx.rng.gen_range(0.3..0.8);
            }
            a.move_cooldown -= TICK_QUANTUM;
        })
    }

    fn reset(&mut self, rng: &mut StdRng) {
        *self = Self::new(rng);
    }

    fn state_tag(&self) -> AgentState {
        AgentState::Exploring
    }
}

/// Aimless background roaming.  Never finishes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Wander {
    pub move_cooldown: f64,
}

impl Wander {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Action for Wander {
    fn tick(&mut self, ctx: &mut TickContext<'_>) -> NodeStatus {
        if self.move_cooldown <= 0.0 {
            let dx = pick(ctx.rng, &[-1, 0, 1]);
            let dy = pick(ctx.rng, &[-1, 0, 1]);
            ctx.body.step(dx, dy);
            self.move_cooldown = ctx.rng.gen_range(0.5..2.0);
        }
        self.move_cooldown -= TICK_QUANTUM;
        ctx.body.state = AgentState::Wandering;
        NodeStatus::Running
    }

    fn reset(&mut self, _rng: &mut StdRng) {
        self.move_cooldown = 0.0;
    }

    fn state_tag(&self) -> AgentState {
        AgentState::Wandering
    }

    fn param(&self) -> Option<f64> {
        Some(self.move_cooldown)
    }

    fn set_param(&mut self, value: f64) -> bool {
        self.move_cooldown = value;
        true
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// MoveToTarget
// ─────────────────────────────────────────────────────────────────────────────

/// Walk towards a random point, one unit step per axis per tick.
///
/// A new target is drawn on the first tick and whenever the step budget is
/// used up; running out of budget is not a failure.
#[derive(Debug, Clone, PartialEq)]
pub struct MoveToTarget {
    pub target: Option<Position>,
    pub move_steps: u32,
    pub max_steps: u32,
}

impl MoveToTarget {
    pub fn new(rng: &mut StdRng) -> Self {
        Self {
            target: None,
            move_steps: 0,
            max_steps: rng.gen_range(5..=15),
        }
    }

    /// Random target inside the inner region of the grid
    /// (`[5, width-5] × [5, height-4]`, squeezed for tiny grids).
    pub fn pick_target(bounds: GridBounds, rng: &mut StdRng) -> Position {
        let axis = |lo: i32, hi: i32, size: i32, rng: &mut StdRng| {
            let lo = lo.min(size - 1);
            let hi = hi.clamp(lo, size - 1);
            rng.gen_range(lo..=hi)
        };
        let x = axis(5, bounds.width - 5, bounds.width, rng);
        let y = axis(5, bounds.height - 4, bounds.height, rng);
        Position::new(x, y)
    }
}

impl Action for MoveToTarget {
    fn tick(&mut self, ctx: &mut TickContext<'_>) -> NodeStatus {
        let target = match self.target {
            Some(t) if self.move_steps < self.max_steps => t,
            _ => {
                let t = Self::pick_target(ctx.body.bounds, ctx.rng);
                self.target = Some(t);
                self.move_steps = 0;
                t
            }
        };

        let here = ctx.body.position;
        ctx.body
            .step((target.x - here.x).signum(), (target.y - here.y).signum());
        ctx.body.state = AgentState::Moving;
        self.move_steps += 1;

        if ctx.body.position.chebyshev(target) <= 1 {
            self.reset(ctx.rng);
            return NodeStatus::Success;
        }
        NodeStatus::Running
    }

    fn reset(&mut self, rng: &mut StdRng) {
        *self = Self::new(rng);
    }

    fn state_tag(&self) -> AgentState {
        AgentState::Moving
    }
}
