use super::builders::{PAGE, url};
use cors_guard::{
    CheckCallback, CheckOutcome, CorsError, CrossOriginManager, RequestDisposition, SharedRequest,
};
use std::cell::RefCell;
use std::rc::Rc;

/// Collects every outcome delivered to a `handle_request` callback.
#[derive(Clone, Default)]
pub struct Outcomes(Rc<RefCell<Vec<CheckOutcome>>>);

impl Outcomes {
    pub fn callback(&self) -> CheckCallback {
        let sink = Rc::clone(&self.0);
        Box::new(move |outcome| sink.borrow_mut().push(outcome))
    }

    pub fn count(&self) -> usize {
        self.0.borrow().len()
    }

    /// The single delivered verdict; panics on zero, several, or a failure.
    pub fn allowed(&self) -> bool {
        let outcomes = self.0.borrow();
        assert_eq!(outcomes.len(), 1, "expected exactly one outcome, got {:?}", outcomes);
        match &outcomes[0] {
            CheckOutcome::Success { allowed } => *allowed,
            other => panic!("expected a completed check, got {:?}", other),
        }
    }

    pub fn failure(&self) -> CorsError {
        let outcomes = self.0.borrow();
        match outcomes.as_slice() {
            [CheckOutcome::Failure(err)] => err.clone(),
            other => panic!("expected a single failure, got {:?}", other),
        }
    }
}

pub fn submit(
    manager: &mut CrossOriginManager,
    request: &SharedRequest,
) -> Result<(RequestDisposition, Outcomes), CorsError> {
    let outcomes = Outcomes::default();
    let target = request.borrow().url().clone();
    let disposition =
        manager.handle_request(request, &url(PAGE), &target, outcomes.callback())?;
    Ok((disposition, outcomes))
}

pub fn assert_completed(disposition: RequestDisposition) {
    assert_eq!(disposition, RequestDisposition::Completed);
}

pub fn assert_pending(disposition: RequestDisposition) -> cors_guard::CancelToken {
    match disposition {
        RequestDisposition::Pending(token) => token,
        other => panic!("expected a pending preflight, got {:?}", other),
    }
}
