use std::cell::RefCell;
use std::rc::Rc;

use pagelist_core::{
    ChangeType, ControllerObserver, ControllerState, ListControllerObserver, StatefulController,
};

/// One callback received by a [`RecordingObserver`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObservedEvent {
    StateChanged {
        from: ControllerState,
        to: ControllerState,
    },
    WillChangeContent,
    DidChange(ChangeType),
    DidChangeContent,
}

/// List observer that records every callback in arrival order.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: RefCell<Vec<ObservedEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn events(&self) -> Vec<ObservedEvent> {
        self.events.borrow().clone()
    }

    /// Returns and forgets everything recorded so far.
    pub fn take(&self) -> Vec<ObservedEvent> {
        std::mem::take(&mut *self.events.borrow_mut())
    }

    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }

    pub fn states(&self) -> Vec<(ControllerState, ControllerState)> {
        self.events
            .borrow()
            .iter()
            .filter_map(|event| match event {
                ObservedEvent::StateChanged { from, to } => Some((from.clone(), to.clone())),
                _ => None,
            })
            .collect()
    }

    /// Structural changes grouped by bracket.
    ///
    /// # Panics
    ///
    /// When brackets nest, a change arrives outside a bracket, or a bracket is
    /// left open.
    pub fn brackets(&self) -> Vec<Vec<ChangeType>> {
        let mut brackets = Vec::new();
        let mut open: Option<Vec<ChangeType>> = None;
        for event in self.events.borrow().iter() {
            match event {
                ObservedEvent::StateChanged { .. } => {}
                ObservedEvent::WillChangeContent => {
                    assert!(open.is_none(), "bracket opened inside another bracket");
                    open = Some(Vec::new());
                }
                ObservedEvent::DidChange(change) => match open.as_mut() {
                    Some(bracket) => bracket.push(*change),
                    None => panic!("{change:?} delivered outside a bracket"),
                },
                ObservedEvent::DidChangeContent => match open.take() {
                    Some(bracket) => brackets.push(bracket),
                    None => panic!("bracket closed without being opened"),
                },
            }
        }
        assert!(open.is_none(), "bracket left open");
        brackets
    }

    /// Every structural change, brackets flattened.
    pub fn changes(&self) -> Vec<ChangeType> {
        self.brackets().into_iter().flatten().collect()
    }

    fn record(&self, event: ObservedEvent) {
        log::trace!("observed {event:?}");
        self.events.borrow_mut().push(event);
    }
}

impl ControllerObserver for RecordingObserver {
    fn controller_did_change_state(
        &self,
        _controller: &dyn StatefulController,
        from: &ControllerState,
        to: &ControllerState,
    ) {
        self.record(ObservedEvent::StateChanged {
            from: from.clone(),
            to: to.clone(),
        });
    }

    fn as_list_observer(&self) -> Option<&dyn ListControllerObserver> {
        Some(self)
    }
}

impl ListControllerObserver for RecordingObserver {
    fn controller_will_change_content(&self, _controller: &dyn StatefulController) {
        self.record(ObservedEvent::WillChangeContent);
    }

    fn controller_did_change(&self, _controller: &dyn StatefulController, change: ChangeType) {
        self.record(ObservedEvent::DidChange(change));
    }

    fn controller_did_change_content(&self, _controller: &dyn StatefulController) {
        self.record(ObservedEvent::DidChangeContent);
    }
}

/// Observer without the list capability; sees state transitions only.
#[derive(Debug, Default)]
pub struct StateRecorder {
    transitions: RefCell<Vec<(ControllerState, ControllerState)>>,
}

impl StateRecorder {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn transitions(&self) -> Vec<(ControllerState, ControllerState)> {
        self.transitions.borrow().clone()
    }

    /// The `to` side of every transition.
    pub fn targets(&self) -> Vec<ControllerState> {
        self.transitions
            .borrow()
            .iter()
            .map(|(_, to)| to.clone())
            .collect()
    }
}

impl ControllerObserver for StateRecorder {
    fn controller_did_change_state(
        &self,
        _controller: &dyn StatefulController,
        from: &ControllerState,
        to: &ControllerState,
    ) {
        self.transitions
            .borrow_mut()
            .push((from.clone(), to.clone()));
    }
}
