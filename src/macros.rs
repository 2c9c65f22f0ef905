/// Creates [`Steps`](crate::coroutine::Steps) from the passed stage closures.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use cotick::steps;
///
/// let routine = steps![
///     |_cx| {
///         println!("lift");
///         None
///     },
///     |cx| Some(cx.wait_for(Duration::from_millis(300))),
///     |_cx| {
///         println!("lower");
///         None
///     },
/// ];
/// assert_eq!(routine.len(), 3);
/// ```
#[macro_export]
macro_rules! steps {
    ($($stage:expr),* $(,)?) => {
        $crate::coroutine::Steps::new()$(.then($stage))*
    };
}
