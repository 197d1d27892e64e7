/// Partition `items` into consecutive groups of at most `max_group_size`.
///
/// Order is preserved and only the last group may be smaller. A size of zero
/// is treated as one.
pub fn group<T>(items: Vec<T>, max_group_size: usize) -> Vec<Vec<T>> {
  let max_group_size = max_group_size.max(1);
  let mut groups = Vec::with_capacity(items.len().div_ceil(max_group_size));
  let mut current = Vec::with_capacity(max_group_size.min(items.len()));

  for item in items {
    if current.len() == max_group_size {
      groups.push(std::mem::replace(&mut current, Vec::with_capacity(max_group_size)));
    }
    current.push(item);
  }
  if !current.is_empty() {
    groups.push(current);
  }

  groups
}

/// Count-bounded batching used for both provider calls and fan-out messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedSizeBatching {
  max_batch_size: usize,
}

impl FixedSizeBatching {
  pub fn new(max_batch_size: usize) -> Self {
    tracing::trace!(items_per_batch = max_batch_size, "Creating FixedSizeBatching");
    Self {
      max_batch_size: max_batch_size.max(1),
    }
  }

  pub fn prepare_batches<T>(&self, items: Vec<T>) -> Vec<Vec<T>> {
    group(items, self.max_batch_size)
  }

  pub fn max_batch_size(&self) -> usize {
    self.max_batch_size
  }
}
