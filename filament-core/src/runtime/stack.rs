//! Active-subscriber stack.
//!
//! The stack tracks which effect is currently running. This enables
//! automatic dependency capture: when an observable is read, the innermost
//! running effect is registered as a subscriber.
//!
//! # Implementation
//!
//! We use a thread-local stack of effects. Entering a run pushes the effect;
//! leaving pops it. A stack (rather than a single slot) is required so that
//! an effect which reads a computed ref - whose getter runs as its own
//! effect - sees the outer effect restored when the getter returns. Nesting
//! depth is bounded only by the call stack.

use std::cell::RefCell;
use std::sync::Arc;

use crate::effect::{Effect, EffectId};

thread_local! {
    static ACTIVE_EFFECTS: RefCell<Vec<Arc<Effect>>> = const { RefCell::new(Vec::new()) };
}

/// Guard that pops the active-effect stack when dropped.
///
/// This keeps the stack balanced even if the effect function panics.
pub(crate) struct ActiveGuard {
    effect_id: EffectId,
}

impl ActiveGuard {
    /// Push an effect onto the active stack for the duration of its run.
    pub(crate) fn enter(effect: Arc<Effect>) -> Self {
        let effect_id = effect.id();
        ACTIVE_EFFECTS.with(|stack| stack.borrow_mut().push(effect));
        Self { effect_id }
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        ACTIVE_EFFECTS.with(|stack| {
            let popped = stack.borrow_mut().pop();

            // Catch mismatched push/pop pairs early in debug builds.
            if let Some(effect) = popped {
                debug_assert_eq!(
                    effect.id(),
                    self.effect_id,
                    "active-effect stack mismatch: expected {:?}, got {:?}",
                    self.effect_id,
                    effect.id()
                );
            }
        });
    }
}

/// The innermost running effect, if any.
pub(crate) fn current() -> Option<Arc<Effect>> {
    ACTIVE_EFFECTS.with(|stack| stack.borrow().last().cloned())
}

/// Whether any effect is currently running on this thread.
pub fn is_tracking() -> bool {
    ACTIVE_EFFECTS.with(|stack| !stack.borrow().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn idle_effect() -> Arc<Effect> {
        Effect::new(|| Value::Unit)
    }

    #[test]
    fn stack_tracks_current_effect() {
        assert!(!is_tracking());
        assert!(current().is_none());

        let effect = idle_effect();
        {
            let _guard = ActiveGuard::enter(Arc::clone(&effect));
            assert!(is_tracking());
            assert_eq!(current().map(|e| e.id()), Some(effect.id()));
        }

        assert!(!is_tracking());
        assert!(current().is_none());
    }

    #[test]
    fn nested_guards_restore_the_outer_effect() {
        let outer = idle_effect();
        let inner = idle_effect();

        let _outer_guard = ActiveGuard::enter(Arc::clone(&outer));
        assert_eq!(current().map(|e| e.id()), Some(outer.id()));

        {
            let _inner_guard = ActiveGuard::enter(Arc::clone(&inner));
            assert_eq!(current().map(|e| e.id()), Some(inner.id()));
        }

        assert_eq!(current().map(|e| e.id()), Some(outer.id()));
    }
}
