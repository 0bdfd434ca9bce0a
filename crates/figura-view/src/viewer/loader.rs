use figura_io::{LoadError, Pending};
use tracing::debug;

#[derive(Debug)]
struct InFlight<T> {
    ticket: u64,
    pending: Pending<T>,
}

/// A finished request that is still the latest one on its channel.
#[derive(Debug)]
pub struct Completion<T> {
    pub ticket: u64,
    pub url: String,
    pub result: Result<T, LoadError>,
    /// The safety timeout had already fired for this request.
    pub late: bool,
}

/// One kind of asset request (model, animation, environment). Every request takes a new
/// ticket; only the newest ticket's result is ever handed out.
#[derive(Debug)]
pub struct Channel<T> {
    kind: &'static str,
    latest: u64,
    current_url: Option<String>,
    started_at: f32,
    timed_out: bool,
    in_flight: Vec<InFlight<T>>,
}

impl<T> Channel<T> {
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            latest: 0,
            current_url: None,
            started_at: 0.0,
            timed_out: false,
            in_flight: Vec::new(),
        }
    }

    pub fn begin(&mut self, pending: Pending<T>, now: f32) -> u64 {
        self.latest += 1;
        self.current_url = Some(pending.url().to_string());
        self.started_at = now;
        self.timed_out = false;
        debug!(kind = self.kind, ticket = self.latest, url = %pending.url(), "request issued");
        self.in_flight.push(InFlight {
            ticket: self.latest,
            pending,
        });
        self.latest
    }

    pub fn latest_ticket(&self) -> u64 {
        self.latest
    }

    pub fn current_url(&self) -> Option<&str> {
        self.current_url.as_deref()
    }

    /// The newest request has not answered yet.
    pub fn is_awaiting(&self) -> bool {
        self.in_flight.iter().any(|request| request.ticket == self.latest)
    }

    /// Waiting and still within the safety timeout.
    pub fn is_loading(&self) -> bool {
        self.is_awaiting() && !self.timed_out
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Collects finished requests. Stale answers are discarded; the newest one is returned.
    pub fn poll(&mut self) -> Option<Completion<T>> {
        let mut completion = None;
        let latest = self.latest;
        let kind = self.kind;
        let timed_out = self.timed_out;
        self.in_flight.retain(|request| {
            let Some(result) = request.pending.try_take() else {
                return true;
            };
            if request.ticket == latest {
                completion = Some(Completion {
                    ticket: request.ticket,
                    url: request.pending.url().to_string(),
                    result,
                    late: timed_out,
                });
            } else {
                debug!(
                    kind,
                    ticket = request.ticket,
                    latest,
                    url = %request.pending.url(),
                    ok = result.is_ok(),
                    "dropping stale completion"
                );
            }
            false
        });
        completion
    }

    /// Fires once per request when it has been waiting `limit` seconds; returns its URL.
    pub fn check_timeout(&mut self, now: f32, limit: f32) -> Option<String> {
        if self.timed_out || !self.is_awaiting() || now - self.started_at < limit {
            return None;
        }
        self.timed_out = true;
        self.current_url.clone()
    }

    /// Invalidates everything in flight; their answers will never be delivered.
    pub fn cancel(&mut self) {
        if !self.in_flight.is_empty() {
            debug!(kind = self.kind, dropped = self.in_flight.len(), "requests abandoned");
        }
        self.latest += 1;
        self.in_flight.clear();
        self.timed_out = false;
    }
}
