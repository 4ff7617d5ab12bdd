//! Scripted fake page driver for browser-free tests.

use crate::browser::{Control, PageDriver};
use anyhow::{Result, anyhow};
use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

/// Scripted response for one `click` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickOutcome {
    Clicked,
    Absent,
    /// The interaction itself breaks (element vanished mid-click).
    Broken,
}

/// A `PageDriver` that replays pre-scripted responses. Each queue is popped
/// per call; an exhausted queue falls back to a quiet default (no cards, no
/// panel, absent controls, no next page) so tests only script what they
/// exercise.
#[derive(Default)]
pub struct FakeDriver {
    pub id_rounds: Mutex<VecDeque<Option<Vec<String>>>>,
    pub pages: Mutex<VecDeque<String>>,
    pub details: Mutex<VecDeque<Option<String>>>,
    pub modal_rounds: Mutex<VecDeque<bool>>,
    pub click_script: Mutex<HashMap<Control, VecDeque<ClickOutcome>>>,
    pub advance_rounds: Mutex<VecDeque<bool>>,
    pub fail_open_card: Mutex<bool>,
    pub fail_modal: Mutex<bool>,

    pub scrolls: Mutex<u32>,
    pub clicked: Mutex<Vec<Control>>,
    pub opened: Mutex<Vec<String>>,
}

impl FakeDriver {
    pub fn new() -> Self {
        FakeDriver::default()
    }

    /// Script successive `card_ids` responses; the last one repeats forever.
    /// `None` simulates a broken DOM query.
    pub fn with_id_rounds(self, rounds: Vec<Option<Vec<String>>>) -> Self {
        *self.id_rounds.lock().unwrap() = rounds.into();
        self
    }

    pub fn with_pages(self, pages: Vec<&str>) -> Self {
        *self.pages.lock().unwrap() = pages.into_iter().map(String::from).collect();
        self
    }

    pub fn with_details(self, details: Vec<Option<&str>>) -> Self {
        *self.details.lock().unwrap() = details
            .into_iter()
            .map(|d| d.map(String::from))
            .collect();
        self
    }

    pub fn with_modal(self, rounds: Vec<bool>) -> Self {
        *self.modal_rounds.lock().unwrap() = rounds.into();
        self
    }

    pub fn with_clicks(self, control: Control, outcomes: Vec<ClickOutcome>) -> Self {
        self.click_script
            .lock()
            .unwrap()
            .insert(control, outcomes.into());
        self
    }

    /// Make every `modal_open` call fail, as a broken session would.
    pub fn with_modal_failure(self) -> Self {
        *self.fail_modal.lock().unwrap() = true;
        self
    }

    pub fn with_advance(self, rounds: Vec<bool>) -> Self {
        *self.advance_rounds.lock().unwrap() = rounds.into();
        self
    }

    pub fn click_count(&self) -> usize {
        self.clicked.lock().unwrap().len()
    }
}

impl PageDriver for FakeDriver {
    async fn card_ids(&self) -> Result<Vec<String>> {
        let mut rounds = self.id_rounds.lock().unwrap();
        let next = if rounds.len() > 1 {
            rounds.pop_front()
        } else {
            rounds.front().cloned()
        };
        match next {
            Some(Some(ids)) => Ok(ids),
            Some(None) => Err(anyhow!("scripted card query failure")),
            None => Ok(vec![]),
        }
    }

    async fn scroll_feed(&self) -> Result<()> {
        *self.scrolls.lock().unwrap() += 1;
        Ok(())
    }

    async fn page_html(&self) -> Result<String> {
        Ok(self.pages.lock().unwrap().pop_front().unwrap_or_default())
    }

    async fn open_card(&self, id: &str) -> Result<()> {
        if *self.fail_open_card.lock().unwrap() {
            return Err(anyhow!("scripted open_card failure"));
        }
        self.opened.lock().unwrap().push(id.to_string());
        Ok(())
    }

    async fn detail_html(&self) -> Result<Option<String>> {
        Ok(self.details.lock().unwrap().pop_front().flatten())
    }

    async fn modal_open(&self) -> Result<bool> {
        if *self.fail_modal.lock().unwrap() {
            return Err(anyhow!("scripted dialog check failure"));
        }
        // Unscripted tests get an open modal so the wizard can run.
        Ok(self.modal_rounds.lock().unwrap().pop_front().unwrap_or(true))
    }

    async fn click(&self, control: Control) -> Result<bool> {
        let outcome = self
            .click_script
            .lock()
            .unwrap()
            .get_mut(&control)
            .and_then(|q| q.pop_front())
            .unwrap_or(ClickOutcome::Absent);
        match outcome {
            ClickOutcome::Clicked => {
                self.clicked.lock().unwrap().push(control);
                Ok(true)
            }
            ClickOutcome::Absent => Ok(false),
            ClickOutcome::Broken => Err(anyhow!("scripted click failure on {control:?}")),
        }
    }

    async fn advance_page(&self) -> Result<bool> {
        Ok(self.advance_rounds.lock().unwrap().pop_front().unwrap_or(false))
    }

    async fn settle(&self, _wait: Duration) {}
}
