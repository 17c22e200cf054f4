#![allow(unused_macros)]

/// Helper macro for reading locked items
///
/// ```rust, ignore
///  let constraints = read_lock!(param.constraints);
///  println!("{}", constraints.len());
/// ```
macro_rules! read_lock {
    ($arc_rwlock:expr) => {
        $arc_rwlock.read().expect("Failed to acquire read lock")
    };
}

/// Helper macro for writing to locked items
///
/// ```rust, ignore
///  let mut constraints = write_lock!(param.constraints);
///  constraints.push(new_constraint);
/// ```
macro_rules! write_lock {
    ($arc_rwlock:expr) => {
        $arc_rwlock.write().expect("Failed to acquire write lock")
    };
}
