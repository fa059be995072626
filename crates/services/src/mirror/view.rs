//! Per-poll view state: `Loading → Voting | Viewing | NotFound`, `Voting → Viewing`.
//! Nothing leaves `Viewing` or `NotFound`.

use domains::{OptionId, Poll, PollId};

use super::Participation;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewState {
    Loading,
    /// This session has not voted yet
    Voting,
    /// This session has voted; `choice` is its option when known
    Viewing { choice: Option<OptionId> },
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollView {
    pub poll_id: PollId,
    state: ViewState,
    poll: Option<Poll>,
}

impl PollView {
    pub fn loading(poll_id: impl Into<PollId>) -> Self {
        Self {
            poll_id: poll_id.into(),
            state: ViewState::Loading,
            poll: None,
        }
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    /// Latest poll data shown by the view
    pub fn poll(&self) -> Option<&Poll> {
        self.poll.as_ref()
    }

    /// Applies the result of a lookup or refresh.
    ///
    /// `None` while loading means neither store knows the poll. Later `None`s
    /// keep the last-known data.
    pub fn observe(&mut self, lookup: Option<Participation>) {
        match (self.state.clone(), lookup) {
            (ViewState::NotFound, _) => {}
            (ViewState::Loading, None) => self.state = ViewState::NotFound,
            (_, None) => {}
            (ViewState::Viewing { choice }, Some(found)) => {
                self.state = ViewState::Viewing {
                    choice: choice.or(found.choice),
                };
                self.poll = Some(found.poll);
            }
            (ViewState::Loading | ViewState::Voting, Some(found)) => {
                self.state = if found.participated {
                    ViewState::Viewing {
                        choice: found.choice,
                    }
                } else {
                    ViewState::Voting
                };
                self.poll = Some(found.poll);
            }
        }
    }

    /// Records a successful cast from this view.
    pub fn vote_confirmed(&mut self, option_id: OptionId) {
        if self.state == ViewState::Voting {
            self.state = ViewState::Viewing {
                choice: Some(option_id),
            };
        }
    }

    pub fn can_vote(&self) -> bool {
        self.state == ViewState::Voting
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn found(participated: bool, choice: Option<OptionId>) -> Option<Participation> {
        Some(Participation {
            poll: Poll::new("p", "Q", ["a", "b"], 0),
            participated,
            choice,
        })
    }

    #[test]
    fn loading_resolves_to_voting_or_viewing() {
        let mut view = PollView::loading("p");
        view.observe(found(false, None));
        assert_eq!(view.state(), &ViewState::Voting);
        assert!(view.can_vote());

        let mut view = PollView::loading("p");
        view.observe(found(true, Some(1)));
        assert_eq!(view.state(), &ViewState::Viewing { choice: Some(1) });
    }

    #[test]
    fn unknown_poll_is_not_found_and_stays_there() {
        let mut view = PollView::loading("p");
        view.observe(None);
        assert_eq!(view.state(), &ViewState::NotFound);
        view.observe(found(false, None));
        assert_eq!(view.state(), &ViewState::NotFound);
    }

    #[test]
    fn voting_moves_to_viewing_on_confirmation() {
        let mut view = PollView::loading("p");
        view.observe(found(false, None));
        view.vote_confirmed(0);
        assert_eq!(view.state(), &ViewState::Viewing { choice: Some(0) });
    }

    #[test]
    fn viewing_is_never_left() {
        let mut view = PollView::loading("p");
        view.observe(found(true, Some(1)));
        view.observe(found(false, None));
        assert_eq!(view.state(), &ViewState::Viewing { choice: Some(1) });
        view.observe(None);
        assert!(view.poll().is_some());
        view.vote_confirmed(0);
        assert_eq!(view.state(), &ViewState::Viewing { choice: Some(1) });
    }

    #[test]
    fn failed_refresh_keeps_last_known_poll() {
        let mut view = PollView::loading("p");
        view.observe(found(false, None));
        view.observe(None);
        assert_eq!(view.state(), &ViewState::Voting);
        assert_eq!(view.poll().map(|p| p.id.as_str()), Some("p"));
    }
}
