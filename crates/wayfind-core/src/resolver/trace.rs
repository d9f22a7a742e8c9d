//! Step log lines and step fingerprints.

use std::cell::RefCell;

use super::hooks::HookName;
use super::request::ResolveRequest;

/// Fingerprint of a step: the hook plus the parts of the request that
/// decide what the hook will do. Also the line written to the step log.
///
/// `hookName: (path) request?query#fragment[ directory][ module]`
#[must_use]
pub fn stack_entry(hook: &HookName, request: &ResolveRequest) -> String {
    format!(
        "{hook}: ({}) {}{}{}{}{}",
        request.path.as_deref().unwrap_or("false"),
        request.request.as_deref().unwrap_or(""),
        request.query,
        request.fragment,
        if request.directory { " directory" } else { "" },
        if request.module { " module" } else { "" },
    )
}

/// Collects log lines for an error's `details`.
#[derive(Debug, Default)]
pub struct StepLog {
    lines: RefCell<Vec<String>>,
}

impl StepLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, line: &str) {
        self.lines.borrow_mut().push(line.to_string());
    }

    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.lines.borrow().clone()
    }

    #[must_use]
    pub fn into_details(self) -> String {
        self.lines.into_inner().join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stack_entry_format() {
        let mut request = ResolveRequest::new("/app", "lodash");
        request.module = true;
        request.query = "?x".into();
        assert_eq!(
            stack_entry(&HookName::RawModule, &request),
            "rawModule: (/app) lodash?x module"
        );

        request.path = None;
        request.request = None;
        request.module = false;
        request.directory = true;
        assert_eq!(
            stack_entry(&HookName::Resolve, &request),
            "resolve: (false) ?x directory"
        );
    }

    #[test]
    fn test_step_log_details() {
        let log = StepLog::new();
        log.record("one");
        log.record("  two");
        assert_eq!(log.lines().len(), 2);
        assert_eq!(log.into_details(), "one\n  two");
    }
}
