//! Concurrent maintenance of independent stores

/// A unit of work in a [`fan_out`]
pub type Task<'a, E> = Box<dyn FnOnce() -> Result<(), E> + Send + 'a>;

/// Runs all `tasks` concurrently on the rayon pool and waits for every one
/// of them. Returns the errors of the failed tasks, in task order.
pub fn fan_out<'a, E: Send>(tasks: Vec<Task<'a, E>>) -> Vec<E> {
    let mut results: Vec<Option<E>> = tasks.iter().map(|_| None).collect();

    rayon::scope(|scope| {
        for (task, slot) in tasks.into_iter().zip(results.iter_mut()) {
            scope.spawn(move |_| *slot = task().err());
        }
    });

    results.into_iter().flatten().collect()
}
