//! Prometheus counters for the poll routes.

use prometheus_client::encoding::text::encode;
use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::registry::Registry;

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct VoteLabels {
    pub outcome: String,
}

pub struct Metrics {
    registry: Registry,
    polls_created: Counter,
    votes: Family<VoteLabels, Counter>,
}

impl Metrics {
    pub fn new() -> Self {
        let mut registry = Registry::with_prefix("pollstream");
        let polls_created = Counter::default();
        let votes = Family::<VoteLabels, Counter>::default();

        registry.register(
            "polls_created",
            "Polls inserted by the store",
            polls_created.clone(),
        );
        registry.register(
            "votes",
            "Vote submissions by outcome",
            votes.clone(),
        );

        Self {
            registry,
            polls_created,
            votes,
        }
    }

    pub fn poll_created(&self) {
        self.polls_created.inc();
    }

    /// `outcome` is `accepted` or a lowercase rejection kind.
    pub fn vote(&self, outcome: &str) {
        self.votes
            .get_or_create(&VoteLabels {
                outcome: outcome.to_string(),
            })
            .inc();
    }

    /// Text exposition format.
    pub fn render(&self) -> Result<String, std::fmt::Error> {
        let mut buffer = String::new();
        encode(&mut buffer, &self.registry)?;
        Ok(buffer)
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
