//! Minimal time-based interpolation driver.
//!
//! A [`TweenScheduler<C>`] owns any number of independent tweens. Each tick
//! advances them by an unscaled delta time and hands the eased progress to
//! their update callbacks together with a caller-supplied context `C`, which
//! is how callbacks reach the state they animate.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Closed-form easing curves over normalized time `a` in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Ease {
    #[default]
    Linear,
    EaseInQuad,
    EaseOutQuad,
    EaseInExpo,
    EaseOutExpo,
}

impl Ease {
    pub fn apply(self, a: f32) -> f32 {
        match self {
            Ease::Linear => a,
            Ease::EaseInQuad => a * a,
            Ease::EaseOutQuad => -a * (a - 2.0),
            Ease::EaseInExpo => 2f32.powf(10.0 * (a - 1.0)),
            Ease::EaseOutExpo => 1.0 - 2f32.powf(-10.0 * a),
        }
    }
}

/// Eased progress of a tween that has run for `elapsed` of `duration` seconds.
///
/// Always exactly `0` until time has actually elapsed.
pub fn normalized_time(elapsed: f32, duration: f32, ease: Ease) -> f32 {
    if elapsed <= 0.0 {
        return 0.0;
    }
    ease.apply((elapsed / duration).clamp(0.0, 1.0))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TweenHandle(u64);

type UpdateFn<C> = Box<dyn FnMut(&mut C, f32)>;
type CompleteFn<C> = Box<dyn FnOnce(&mut C)>;

pub struct Tween<C> {
    handle: TweenHandle,
    update: UpdateFn<C>,
    on_complete: Option<CompleteFn<C>>,
    delay: f32,
    duration: f32,
    elapsed: f32,
    ease: Ease,
}

impl<C> Tween<C> {
    #[inline]
    pub fn handle(&self) -> TweenHandle {
        self.handle
    }

    /// Seconds to wait before the tween starts advancing.
    pub fn with_delay(&mut self, delay: f32) -> &mut Self {
        self.delay = delay;
        self
    }

    pub fn with_ease(&mut self, ease: Ease) -> &mut Self {
        self.ease = ease;
        self
    }

    /// Starts the tween part-way through.
    pub fn with_elapsed(&mut self, elapsed: f32) -> &mut Self {
        self.elapsed = elapsed;
        self
    }

    pub fn on_complete<F>(&mut self, f: F) -> &mut Self
    where
        F: FnOnce(&mut C) + 'static,
    {
        self.on_complete = Some(Box::new(f));
        self
    }

    pub fn delay(&self) -> f32 {
        self.delay
    }

    pub fn duration(&self) -> f32 {
        self.duration
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn ease(&self) -> Ease {
        self.ease
    }
}

impl<C> fmt::Debug for Tween<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tween")
            .field("handle", &self.handle)
            .field("delay", &self.delay)
            .field("duration", &self.duration)
            .field("elapsed", &self.elapsed)
            .field("ease", &self.ease)
            .field("has_on_complete", &self.on_complete.is_some())
            .finish()
    }
}

/// Cancels tweens from inside another tween's callbacks.
///
/// Requests are applied before the scheduler touches the next tween.
#[derive(Debug, Clone, Default)]
pub struct TweenCanceller {
    pending: Rc<RefCell<Vec<TweenHandle>>>,
}

impl TweenCanceller {
    pub fn cancel(&self, handle: TweenHandle) {
        self.pending.borrow_mut().push(handle);
    }

    fn take(&self) -> Vec<TweenHandle> {
        std::mem::take(&mut *self.pending.borrow_mut())
    }
}

pub struct TweenScheduler<C> {
    tweens: Vec<Tween<C>>,
    next_id: u64,
    canceller: TweenCanceller,
}

impl<C> Default for TweenScheduler<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> fmt::Debug for TweenScheduler<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TweenScheduler")
            .field("tweens", &self.tweens)
            .field("next_id", &self.next_id)
            .finish()
    }
}

impl<C> TweenScheduler<C> {
    pub fn new() -> Self {
        Self {
            tweens: Vec::new(),
            next_id: 1,
            canceller: TweenCanceller::default(),
        }
    }

    /// Registers a linear tween with no delay. Chain the returned builder to
    /// customise it.
    pub fn start<F>(&mut self, duration: f32, update: F) -> &mut Tween<C>
    where
        F: FnMut(&mut C, f32) + 'static,
    {
        let handle = TweenHandle(self.next_id);
        self.next_id += 1;
        self.tweens.push(Tween {
            handle,
            update: Box::new(update),
            on_complete: None,
            delay: 0.0,
            duration,
            elapsed: 0.0,
            ease: Ease::Linear,
        });
        let index = self.tweens.len() - 1;
        &mut self.tweens[index]
    }

    /// Removes the tween if it is still active. Unknown or finished handles
    /// are ignored.
    pub fn cancel(&mut self, handle: TweenHandle) -> bool {
        match self.position(handle) {
            Some(index) => {
                self.tweens.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn canceller(&self) -> TweenCanceller {
        self.canceller.clone()
    }

    pub fn is_active(&self, handle: TweenHandle) -> bool {
        self.position(handle).is_some()
    }

    pub fn get(&self, handle: TweenHandle) -> Option<&Tween<C>> {
        self.position(handle).map(|index| &self.tweens[index])
    }

    pub fn len(&self) -> usize {
        self.tweens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tweens.is_empty()
    }

    pub fn clear(&mut self) {
        self.tweens.clear();
    }

    /// Advances every tween by `dt` seconds, most recently started first.
    pub fn tick(&mut self, dt: f32, ctx: &mut C) {
        let order: Vec<TweenHandle> = self.tweens.iter().rev().map(|t| t.handle).collect();

        for handle in order {
            self.apply_pending_cancellations();
            let Some(index) = self.position(handle) else {
                continue;
            };

            {
                let tween = &mut self.tweens[index];
                if tween.delay > 0.0 {
                    tween.delay -= dt;
                    continue;
                }
                tween.elapsed += dt;
                let t = normalized_time(tween.elapsed, tween.duration, tween.ease);
                (tween.update)(ctx, t);
            }

            // The update may have cancelled this very tween.
            self.apply_pending_cancellations();
            let Some(index) = self.position(handle) else {
                continue;
            };
            if self.tweens[index].elapsed >= self.tweens[index].duration {
                let finished = self.tweens.remove(index);
                if let Some(on_complete) = finished.on_complete {
                    on_complete(ctx);
                }
            }
        }

        self.apply_pending_cancellations();
    }

    fn position(&self, handle: TweenHandle) -> Option<usize> {
        self.tweens.iter().position(|t| t.handle == handle)
    }

    fn apply_pending_cancellations(&mut self) {
        for handle in self.canceller.take() {
            self.cancel(handle);
        }
    }
}
