//! Live views over store collections.
//!
//! A [`Subscription`] yields the current snapshot of a collection on its
//! first [`next`](Subscription::next), then one snapshot per change. Rapid
//! changes may be coalesced, but every value yielded is complete. Dropping
//! the subscription releases the listener; there is nothing else to cancel.

use std::sync::Arc;

use tokio::sync::watch;

/// A complete copy of a collection as published by the store.
pub type Snapshot<T> = Arc<Vec<T>>;

type Projection<S, T> = Box<dyn Fn(S) -> T + Send + Sync>;

pub struct Subscription<S, T = S> {
  rx:      watch::Receiver<S>,
  project: Projection<S, T>,
  primed:  bool,
}

impl<S> Subscription<S>
where
  S: Clone + Send + Sync + 'static,
{
  pub fn new(rx: watch::Receiver<S>) -> Self {
    Self {
      rx,
      project: Box::new(|snapshot| snapshot),
      primed: false,
    }
  }
}

impl<S, T> Subscription<S, T>
where
  S: Clone + Send + Sync + 'static,
  T: 'static,
{
  /// Wait for the next snapshot.
  ///
  /// Returns `None` once the publishing side has gone away; the view should
  /// then be shown as unavailable. A closed subscription cannot be restarted;
  /// subscribe again instead.
  pub async fn next(&mut self) -> Option<T> {
    if self.primed {
      self.rx.changed().await.ok()?;
    }
    self.primed = true;
    let snapshot = self.rx.borrow_and_update().clone();
    Some((self.project)(snapshot))
  }

  /// Transform every snapshot this subscription yields.
  pub fn map<U, F>(self, f: F) -> Subscription<S, U>
  where
    F: Fn(T) -> U + Send + Sync + 'static,
  {
    let project = self.project;
    Subscription {
      rx:      self.rx,
      project: Box::new(move |snapshot| f(project(snapshot))),
      primed:  self.primed,
    }
  }

  /// True once the publisher is gone and no further snapshot will arrive.
  pub fn is_closed(&self) -> bool { self.rx.has_changed().is_err() }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn yields_current_then_changes() {
    let (tx, rx) = watch::channel(1_u32);
    let mut sub = Subscription::new(rx).map(|n| n * 10);

    assert_eq!(sub.next().await, Some(10));
    tx.send_replace(2);
    assert_eq!(sub.next().await, Some(20));
  }

  #[tokio::test]
  async fn ends_when_publisher_drops() {
    let (tx, rx) = watch::channel(1_u32);
    let mut sub = Subscription::new(rx);
    assert_eq!(sub.next().await, Some(1));
    drop(tx);
    assert_eq!(sub.next().await, None);
    assert!(sub.is_closed());
  }

  #[tokio::test]
  async fn dropping_releases_the_receiver() {
    let (tx, rx) = watch::channel(0_u32);
    let sub = Subscription::new(rx);
    assert_eq!(tx.receiver_count(), 1);
    drop(sub);
    assert_eq!(tx.receiver_count(), 0);
  }
}
