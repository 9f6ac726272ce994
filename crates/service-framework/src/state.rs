//! # State Transition Engine
//!
//! Generic guarded state transitions with enter/action/exit hooks and a
//! blocking `wait_for`. This is the primitive underneath the service
//! lifecycle machine, but it works for any finite state set.
//!
//! ## Architecture Note
//!
//! A [`Transition`] is an immutable value: it names the states it may fire
//! from, the state it produces, and up to four callables (guard, enter,
//! action, exit). The refinement methods (`guard`, `enter`, `action`,
//! `exit`) consume the value and return a new one, so a declared transition
//! can be shared and specialized without interior mutation.
//!
//! A [`StateMachine`] owns the current state behind a mutex/condvar pair and
//! derives a `source -> target -> Transition` table once at construction.
//! Firing a transition:
//!
//! 1. Reads the current state; if it is not one of the transition's source
//!    states the call is rejected with
//!    [`TransitionError::InvalidTransition`] and the state is unchanged.
//! 2. Evaluates the guard; a `false` guard is a silent no-op that returns
//!    the unchanged current state without running any hook.
//! 3. Runs `on_enter`, then `action`, then `on_exit` while holding the
//!    machine's transition lock, sets the new state, and wakes every thread
//!    blocked in [`StateMachine::wait_for`].
//!
//! The hook sequence is atomic with respect to observers of the current
//! state: no observer sees the target state before all hooks have run, and
//! two transitions on the same machine never interleave their hooks.
//!
//! A hook must not fire another transition on the same machine; the
//! transition lock is not reentrant. Transitions on *other* machines (for
//! example a child's) are fine, which is exactly what lifecycle propagation
//! does.
//!
//! ## Example
//!
//! ```
//! use service_framework::{StateMachine, Transition};
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
//! enum Switch { Off, On }
//!
//! let turn_on = Transition::new([Switch::Off], Switch::On);
//! let turn_off = Transition::new([Switch::On], Switch::Off);
//! let machine: StateMachine<Switch, ()> =
//!     StateMachine::new(Switch::Off, [turn_on.clone(), turn_off.clone()]);
//!
//! assert!(machine.fire(&turn_off, &()).is_err());
//! assert_eq!(machine.fire(&turn_on, &()).unwrap(), Switch::On);
//! assert_eq!(machine.fire(&turn_off, &()).unwrap(), Switch::Off);
//! ```

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::error::{BoxError, TransitionError};

/// Marker for types usable as machine states: small, copyable, comparable.
pub trait State: Copy + Eq + Hash + Debug + Send + Sync + 'static {}

impl<T: Copy + Eq + Hash + Debug + Send + Sync + 'static> State for T {}

type GuardFn<C> = Arc<dyn Fn(&C) -> bool + Send + Sync>;
type HookFn<C> = Arc<dyn Fn(&C) -> Result<(), BoxError> + Send + Sync>;

/// A guarded state change bundling enter/action/exit hooks.
///
/// `C` is the context handed to every callable when the transition fires,
/// typically the entity that owns the machine. It may be unsized (`dyn`).
pub struct Transition<S, C: ?Sized> {
    sources: Vec<S>,
    target: S,
    guard: Option<GuardFn<C>>,
    on_enter: Option<HookFn<C>>,
    action: Option<HookFn<C>>,
    on_exit: Option<HookFn<C>>,
}

impl<S: State, C: ?Sized> Transition<S, C> {
    /// Declares a transition from any of `sources` to `target` with no
    /// guard and no hooks.
    pub fn new(sources: impl IntoIterator<Item = S>, target: S) -> Self {
        Self {
            sources: sources.into_iter().collect(),
            target,
            guard: None,
            on_enter: None,
            action: None,
            on_exit: None,
        }
    }

    /// Returns a copy of this transition with the given guard. The guard is
    /// evaluated before any hook runs; returning `false` turns the firing
    /// into a silent no-op.
    pub fn guard(self, f: impl Fn(&C) -> bool + Send + Sync + 'static) -> Self {
        Self {
            guard: Some(Arc::new(f)),
            ..self
        }
    }

    /// Returns a copy of this transition with the given enter hook, run
    /// before the action.
    pub fn enter(self, f: impl Fn(&C) -> Result<(), BoxError> + Send + Sync + 'static) -> Self {
        Self {
            on_enter: Some(Arc::new(f)),
            ..self
        }
    }

    /// Returns a copy of this transition with the given action, the meat of
    /// the state change.
    pub fn action(self, f: impl Fn(&C) -> Result<(), BoxError> + Send + Sync + 'static) -> Self {
        Self {
            action: Some(Arc::new(f)),
            ..self
        }
    }

    /// Returns a copy of this transition with the given exit hook, run
    /// after the action.
    pub fn exit(self, f: impl Fn(&C) -> Result<(), BoxError> + Send + Sync + 'static) -> Self {
        Self {
            on_exit: Some(Arc::new(f)),
            ..self
        }
    }

    /// The states this transition may fire from.
    pub fn sources(&self) -> &[S] {
        &self.sources
    }

    /// The state this transition produces.
    pub fn target(&self) -> S {
        self.target
    }
}

impl<S: State, C: ?Sized> Clone for Transition<S, C> {
    fn clone(&self) -> Self {
        Self {
            sources: self.sources.clone(),
            target: self.target,
            guard: self.guard.clone(),
            on_enter: self.on_enter.clone(),
            action: self.action.clone(),
            on_exit: self.on_exit.clone(),
        }
    }
}

/// A mutex/condvar-guarded state holder with a fixed transition table.
///
/// Exactly one machine exists per owning entity. The table is derived once
/// from the declared transitions and is read-only afterwards.
pub struct StateMachine<S, C: ?Sized> {
    initial: S,
    state: Mutex<S>,
    cond: Condvar,
    // Serializes hook sequences; never held while a caller merely reads the
    // current state.
    firing: Mutex<()>,
    table: HashMap<S, HashMap<S, Transition<S, C>>>,
    history: Mutex<Vec<S>>,
}

impl<S: State, C: ?Sized> StateMachine<S, C> {
    /// Creates a machine in `initial`, deriving the lookup table from the
    /// declared transitions.
    pub fn new(initial: S, transitions: impl IntoIterator<Item = Transition<S, C>>) -> Self {
        let mut table: HashMap<S, HashMap<S, Transition<S, C>>> = HashMap::new();
        for t in transitions {
            for source in t.sources().iter().copied() {
                table.entry(source).or_default().insert(t.target(), t.clone());
            }
        }
        Self {
            initial,
            state: Mutex::new(initial),
            cond: Condvar::new(),
            firing: Mutex::new(()),
            table,
            history: Mutex::new(vec![initial]),
        }
    }

    /// The state the machine started in.
    pub fn initial(&self) -> S {
        self.initial
    }

    /// The state the machine is currently in.
    pub fn current(&self) -> S {
        *self.state.lock()
    }

    /// Fires `transition` against this machine with `ctx` handed to every
    /// callable.
    ///
    /// Returns the resulting state: the target on success, or the unchanged
    /// current state when the guard declined. Rejects with
    /// [`TransitionError::InvalidTransition`] when fired outside the
    /// transition's source states, and with [`TransitionError::Hook`] when a
    /// hook fails; in both cases the state is unchanged.
    pub fn fire(&self, transition: &Transition<S, C>, ctx: &C) -> Result<S, TransitionError> {
        let _firing = self.firing.lock();

        let current = *self.state.lock();
        if !transition.sources().contains(&current) {
            return Err(TransitionError::InvalidTransition {
                current: format!("{current:?}"),
                allowed: format!("{:?}", transition.sources()),
            });
        }

        if let Some(guard) = &transition.guard {
            if !guard(ctx) {
                return Ok(current);
            }
        }

        for hook in [&transition.on_enter, &transition.action, &transition.on_exit]
            .into_iter()
            .flatten()
        {
            hook(ctx).map_err(TransitionError::Hook)?;
        }

        let target = transition.target();
        let mut state = self.state.lock();
        *state = target;
        self.history.lock().push(target);
        self.cond.notify_all();
        Ok(target)
    }

    /// Fires whichever declared transition leads from the current state to
    /// `target`. Returns the unchanged current state when the table has no
    /// such route.
    pub fn fire_to(&self, target: S, ctx: &C) -> Result<S, TransitionError> {
        let current = self.current();
        let transition = self
            .table
            .get(&current)
            .and_then(|routes| routes.get(&target))
            .cloned();
        match transition {
            Some(t) => self.fire(&t, ctx),
            None => Ok(current),
        }
    }

    /// Blocks the calling thread until the machine reaches `state` or
    /// `timeout` elapses. Returns `true` if the state was reached, `false`
    /// on timeout. Returns immediately when the machine is already there.
    /// The only cancellation is timeout expiry.
    pub fn wait_for(&self, state: S, timeout: Option<Duration>) -> bool {
        let mut current = self.state.lock();
        match timeout {
            None => {
                while *current != state {
                    self.cond.wait(&mut current);
                }
                true
            }
            Some(timeout) => {
                let deadline = Instant::now() + timeout;
                while *current != state {
                    if self.cond.wait_until(&mut current, deadline).timed_out() {
                        return *current == state;
                    }
                }
                true
            }
        }
    }

    /// Every state this machine has been in, oldest first, starting with
    /// the initial state.
    pub fn playback(&self) -> Vec<S> {
        self.history.lock().clone()
    }

    /// Every state this machine has been in, newest first.
    pub fn rewind(&self) -> Vec<S> {
        let mut history = self.playback();
        history.reverse();
        history
    }
}

/// Gates ordinary calls (not transitions) to a set of allowed states.
///
/// Where [`Transition`] changes state, a `StateGuard` only checks it:
/// operations that make sense solely in certain states wrap themselves in
/// [`StateGuard::call`] and get an
/// [`TransitionError::InvalidTransition`] outside them.
pub struct StateGuard<S> {
    allowed: Vec<S>,
}

impl<S: State> StateGuard<S> {
    pub fn new(allowed: impl IntoIterator<Item = S>) -> Self {
        Self {
            allowed: allowed.into_iter().collect(),
        }
    }

    /// Checks that `machine` is currently in one of the allowed states.
    pub fn check<C: ?Sized>(&self, machine: &StateMachine<S, C>) -> Result<(), TransitionError> {
        let current = machine.current();
        if self.allowed.contains(&current) {
            Ok(())
        } else {
            Err(TransitionError::InvalidTransition {
                current: format!("{current:?}"),
                allowed: format!("{:?}", self.allowed),
            })
        }
    }

    /// Forwards to `f` when the machine is in an allowed state, otherwise
    /// rejects without calling it.
    pub fn call<C: ?Sized, R>(
        &self,
        machine: &StateMachine<S, C>,
        f: impl FnOnce() -> R,
    ) -> Result<R, TransitionError> {
        self.check(machine)?;
        Ok(f())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum Switch {
        Off,
        On,
    }

    fn switch_machine() -> (
        StateMachine<Switch, ()>,
        Transition<Switch, ()>,
        Transition<Switch, ()>,
    ) {
        let turn_on = Transition::new([Switch::Off], Switch::On);
        let turn_off = Transition::new([Switch::On], Switch::Off);
        let machine = StateMachine::new(Switch::Off, [turn_on.clone(), turn_off.clone()]);
        (machine, turn_on, turn_off)
    }

    #[test]
    fn rejects_transition_outside_source_states() {
        let (machine, _, turn_off) = switch_machine();

        let err = machine.fire(&turn_off, &()).unwrap_err();
        assert!(matches!(err, TransitionError::InvalidTransition { .. }));
        assert_eq!(machine.current(), Switch::Off);
    }

    #[test]
    fn fires_through_declared_states() {
        let (machine, turn_on, turn_off) = switch_machine();
        assert_eq!(machine.initial(), Switch::Off);

        assert_eq!(machine.fire(&turn_on, &()).unwrap(), Switch::On);
        assert_eq!(machine.fire(&turn_off, &()).unwrap(), Switch::Off);
        assert_eq!(machine.fire(&turn_on, &()).unwrap(), Switch::On);
        assert_eq!(
            machine.playback(),
            vec![Switch::Off, Switch::On, Switch::Off, Switch::On]
        );
        assert_eq!(
            machine.rewind(),
            vec![Switch::On, Switch::Off, Switch::On, Switch::Off]
        );
    }

    #[test]
    fn false_guard_is_a_silent_no_op() {
        let hooks = Arc::new(AtomicUsize::new(0));
        let h = hooks.clone();
        let counted = move |_: &()| -> Result<(), BoxError> {
            h.fetch_add(1, Ordering::SeqCst);
            Ok(())
        };
        let turn_on = Transition::new([Switch::Off], Switch::On)
            .guard(|_| false)
            .enter(counted.clone())
            .action(counted.clone())
            .exit(counted);
        let machine = StateMachine::new(Switch::Off, [turn_on.clone()]);

        assert_eq!(machine.fire(&turn_on, &()).unwrap(), Switch::Off);
        assert_eq!(machine.current(), Switch::Off);
        assert_eq!(hooks.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn hook_failure_leaves_state_unchanged() {
        let turn_on = Transition::new([Switch::Off], Switch::On)
            .action(|_: &()| Err("burned out".into()));
        let machine = StateMachine::new(Switch::Off, [turn_on.clone()]);

        let err = machine.fire(&turn_on, &()).unwrap_err();
        assert!(matches!(err, TransitionError::Hook(_)));
        assert_eq!(machine.current(), Switch::Off);
        assert_eq!(machine.playback(), vec![Switch::Off]);
    }

    #[test]
    fn hooks_run_enter_action_exit_in_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let record = |label: &'static str, order: &Arc<Mutex<Vec<&'static str>>>| {
            let order = order.clone();
            move |_: &()| -> Result<(), BoxError> {
                order.lock().push(label);
                Ok(())
            }
        };
        let turn_on = Transition::new([Switch::Off], Switch::On)
            .enter(record("enter", &order))
            .action(record("action", &order))
            .exit(record("exit", &order));
        let machine = StateMachine::new(Switch::Off, [turn_on.clone()]);

        machine.fire(&turn_on, &()).unwrap();
        assert_eq!(*order.lock(), vec!["enter", "action", "exit"]);
    }

    #[test]
    fn fire_to_routes_through_the_table() {
        let (machine, _, _) = switch_machine();

        assert_eq!(machine.fire_to(Switch::On, &()).unwrap(), Switch::On);
        // No declared On -> On route: unchanged, no error.
        assert_eq!(machine.fire_to(Switch::On, &()).unwrap(), Switch::On);
        assert_eq!(machine.playback(), vec![Switch::Off, Switch::On]);
    }

    #[test]
    fn wait_for_returns_immediately_when_already_there() {
        let (machine, _, _) = switch_machine();
        assert!(machine.wait_for(Switch::Off, Some(Duration::from_secs(5))));
    }

    #[test]
    fn wait_for_times_out_without_a_transition() {
        let (machine, _, _) = switch_machine();
        assert!(!machine.wait_for(Switch::On, Some(Duration::from_millis(20))));
    }

    #[test]
    fn wait_for_unblocks_on_concurrent_transition() {
        let turn_on = Transition::new([Switch::Off], Switch::On);
        let machine: Arc<StateMachine<Switch, ()>> =
            Arc::new(StateMachine::new(Switch::Off, [turn_on.clone()]));

        let waiter = {
            let machine = machine.clone();
            std::thread::spawn(move || machine.wait_for(Switch::On, Some(Duration::from_secs(5))))
        };
        std::thread::sleep(Duration::from_millis(20));
        machine.fire(&turn_on, &()).unwrap();

        assert!(waiter.join().unwrap());
    }

    #[test]
    fn state_guard_gates_calls_by_state() {
        let (machine, turn_on, _) = switch_machine();
        let only_on = StateGuard::new([Switch::On]);

        assert!(only_on.call(&machine, || "lit").is_err());
        machine.fire(&turn_on, &()).unwrap();
        assert_eq!(only_on.call(&machine, || "lit").unwrap(), "lit");
    }
}
