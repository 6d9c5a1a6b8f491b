use std::fmt;
use std::time::Duration;

use crossbeam_channel::{bounded, select, Receiver, SendTimeoutError, Sender};

use crate::error::{Error, Result};
use crate::parallel::CancelToken;
use crate::sampling::SampleResult;

/// How often a blocked `put` re-checks for cancellation.
const PUT_POLL: Duration = Duration::from_millis(10);

/// Which thread is touching the queue, for logs and errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Role {
    Worker(usize),
    Reducer(usize),
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Worker(p) => write!(f, "worker {p}"),
            Role::Reducer(r) => write!(f, "reducer {r}"),
        }
    }
}

/// Bounded multi-producer/multi-consumer queue of partial results.
///
/// Holds both ends of the channel, so it never disconnects while alive.
#[derive(Debug)]
pub(crate) struct SampleQueue<T> {
    tx: Sender<SampleResult<T>>,
    rx: Receiver<SampleResult<T>>,
}

impl<T> SampleQueue<T> {
    pub(crate) fn new(capacity: usize) -> Self {
        let (tx, rx) = bounded(capacity);
        Self { tx, rx }
    }

    /// Block until an item is available or the token is cancelled.
    pub(crate) fn take(&self, cancel: &CancelToken, role: Role) -> Result<SampleResult<T>> {
        if cancel.is_cancelled() {
            return Err(Error::interrupted(role.to_string()));
        }
        select! {
            recv(self.rx) -> item => item.map_err(|_| disconnected()),
            recv(cancel.signal()) -> _ => Err(Error::interrupted(role.to_string())),
        }
    }

    /// Block until there is room for `item` or the token is cancelled.
    pub(crate) fn put(&self, item: SampleResult<T>, cancel: &CancelToken, role: Role) -> Result<()> {
        let mut item = item;
        loop {
            match self.tx.send_timeout(item, PUT_POLL) {
                Ok(()) => return Ok(()),
                Err(SendTimeoutError::Timeout(back)) => {
                    if cancel.is_cancelled() {
                        return Err(Error::interrupted(role.to_string()));
                    }
                    item = back;
                }
                Err(SendTimeoutError::Disconnected(_)) => return Err(disconnected()),
            }
        }
    }

    /// Put back an item this thread just took. Never blocks.
    pub(crate) fn restore(&self, item: SampleResult<T>) -> Result<()> {
        self.tx
            .try_send(item)
            .map_err(|_| Error::Inconsistent("no room to restore a taken item".to_string()))
    }

    pub(crate) fn try_take(&self) -> Option<SampleResult<T>> {
        self.rx.try_recv().ok()
    }

    pub(crate) fn len(&self) -> usize {
        self.rx.len()
    }
}

fn disconnected() -> Error {
    Error::Inconsistent("sample queue disconnected".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn result(total: u64) -> SampleResult<u64> {
        SampleResult::from_parts(1, total, if total > 0 { vec![0] } else { vec![] }).unwrap()
    }

    #[test]
    fn test_put_take_roundtrip() {
        let queue = SampleQueue::new(2);
        let cancel = CancelToken::new();
        queue.put(result(1), &cancel, Role::Worker(0)).unwrap();
        queue.put(result(2), &cancel, Role::Worker(1)).unwrap();
        assert_eq!(queue.len(), 2);
        let a = queue.take(&cancel, Role::Reducer(0)).unwrap();
        let b = queue.take(&cancel, Role::Reducer(0)).unwrap();
        assert_eq!(a.total() + b.total(), 3);
        assert!(queue.try_take().is_none());
    }

    #[test]
    fn test_take_interrupted() {
        let queue = SampleQueue::<u64>::new(1);
        let cancel = CancelToken::new();
        thread::scope(|s| {
            let waiter = s.spawn(|| queue.take(&cancel, Role::Reducer(4)));
            thread::sleep(Duration::from_millis(20));
            cancel.cancel();
            let err = waiter.join().unwrap().unwrap_err();
            assert!(err.is_interrupted());
            assert_eq!(err.to_string(), "reducer 4 interrupted while waiting");
        });
    }

    #[test]
    fn test_full_put_interrupted() {
        let queue = SampleQueue::new(1);
        let cancel = CancelToken::new();
        queue.put(result(1), &cancel, Role::Worker(0)).unwrap();
        thread::scope(|s| {
            let waiter = s.spawn(|| queue.put(result(2), &cancel, Role::Worker(1)));
            thread::sleep(Duration::from_millis(30));
            cancel.cancel();
            assert!(waiter.join().unwrap().unwrap_err().is_interrupted());
        });
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_restore() {
        let queue = SampleQueue::new(1);
        let cancel = CancelToken::new();
        queue.put(result(5), &cancel, Role::Worker(0)).unwrap();
        let item = queue.take(&cancel, Role::Reducer(0)).unwrap();
        queue.restore(item).unwrap();
        assert!(queue.restore(result(1)).is_err());
        assert_eq!(queue.len(), 1);
    }
}
