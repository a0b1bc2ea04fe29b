//! User-supplied callback hooks invoked synchronously on the monitor loop.

/// The `task_id` passed to [`Callbacks::on_error`] when it is reporting a
/// worker's `cleanup` failure rather than a genuine task failure.
///
/// `cleanup` runs outside any task's lifetime, so there is no real task id
/// to report; task ids are otherwise assigned monotonically from zero by
/// the feeder, so `0` would be indistinguishable from an actual task.
/// `u64::MAX` is outside that range and can never collide with one.
pub const CLEANUP_FAILURE_TASK_ID: u64 = u64::MAX;

/// Callback hooks for one [`crate::Dispatcher::run`] call.
///
/// All callbacks run synchronously, on the same thread that called `run`,
/// in the order outcomes are received from workers. A callback that panics
/// is caught and logged; it never aborts the run or escapes `run`.
pub struct Callbacks<'a, R> {
    /// Invoked once per task that completes successfully. Required.
    pub on_success: &'a mut dyn FnMut(u64, R, u32),
    /// Invoked once per task whose user body returned an error, and once
    /// per worker whose `cleanup` failed. A `cleanup` failure is reported
    /// with `task_id` set to [`CLEANUP_FAILURE_TASK_ID`] rather than a real
    /// task id, since `cleanup` runs outside any task's lifetime.
    pub on_error: Option<&'a mut dyn FnMut(u64, String, u32)>,
    /// Invoked once per task that exceeded its per-task timeout.
    pub on_timeout: Option<&'a mut dyn FnMut(u64, f64, u32)>,
    /// Invoked once per worker whose `setup` failed.
    pub on_setup_fail: Option<&'a mut dyn FnMut(u32, String)>,
    /// Invoked once per task, right before its user body runs.
    pub on_task_start: Option<&'a mut dyn FnMut(u64, u32)>,
    /// Invoked exactly once, after the run has fully drained, regardless of
    /// how it ended.
    pub on_exit: Option<&'a mut dyn FnMut()>,
}

impl<'a, R> Callbacks<'a, R> {
    /// Builds a [`Callbacks`] with only the required `on_success` hook set.
    pub fn new(on_success: &'a mut dyn FnMut(u64, R, u32)) -> Self {
        Self {
            on_success,
            on_error: None,
            on_timeout: None,
            on_setup_fail: None,
            on_task_start: None,
            on_exit: None,
        }
    }
}
