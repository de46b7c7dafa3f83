use std::io::{BufRead, Write};

use tracing::{debug, warn};

use category_engine::{CategoryStore, Request};

use crate::template::{render_target, RedirectRule};

/// The per-request decision function, injected at loop construction.
///
/// `Ok(None)` means no redirect; `Ok(Some(v))` requests a redirect, with `v`
/// available to the template as `%t` (or used verbatim as the target when the
/// redirect rule is the classifier sentinel).  Errors are fatal: a classifier
/// failure (such as a reference to a category the store does not hold) is a
/// misconfiguration, not a per-request condition.
///
/// The trait is deliberately synchronous; the protocol is strict lock-step
/// and classifiers must not block on anything but the store.
pub trait Classifier {
    fn classify(&self, store: &CategoryStore, request: &Request)
        -> anyhow::Result<Option<String>>;
}

/// Errors that stop the protocol loop.
#[derive(Debug, thiserror::Error)]
pub enum ProtoError {
    /// A redirect was required but no redirect rule is configured.
    #[error("redirect required for '{url}' but no redirect rule is configured")]
    MissingRedirectRule { url: String },

    #[error("classifier failed: {0}")]
    Classifier(#[source] anyhow::Error),

    #[error("failed to read request line: {0}")]
    Read(#[source] std::io::Error),

    #[error("failed to write response line: {0}")]
    Write(#[source] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum LoopState {
    Running,
    Stopped,
}

/// Loop behavior switches.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoopOptions {
    /// Answer exactly one request line, then stop.  Used for testing
    /// deployments by hand.
    pub single_shot: bool,
}

/// Drive the synchronous line protocol until end-of-stream.
///
/// One iteration reads one request line, consults the classifier, and writes
/// exactly one newline-terminated response line: the rendered redirect
/// target, or an empty line for "no redirect".  The output is flushed after
/// every line; the calling proxy blocks waiting for its response, so a
/// buffered reply would stall it.  A malformed request line answers with an
/// empty line and a diagnostic instead of stopping the loop.
pub fn run<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    store: &CategoryStore,
    classifier: &dyn Classifier,
    redirect: Option<&RedirectRule>,
    options: LoopOptions,
) -> Result<(), ProtoError> {
    let mut state = LoopState::Running;
    let mut line = String::new();

    while state == LoopState::Running {
        line.clear();
        let n = input.read_line(&mut line).map_err(ProtoError::Read)?;
        if n == 0 {
            state = LoopState::Stopped;
            continue;
        }
        let stripped = line.trim_end_matches(|c| c == '\n' || c == '\r');

        let response = match Request::parse(stripped) {
            Ok(request) => {
                match classifier
                    .classify(store, &request)
                    .map_err(ProtoError::Classifier)?
                {
                    Some(verdict) => {
                        let rule = redirect.ok_or_else(|| ProtoError::MissingRedirectRule {
                            url: request.url.clone(),
                        })?;
                        let target = render_target(rule, &request, &verdict);
                        debug!(url = %request.url, %target, "redirecting");
                        target
                    }
                    None => String::new(),
                }
            }
            Err(e) => {
                warn!(line = stripped, error = %e, "unparseable request line; answering no-redirect");
                String::new()
            }
        };

        output
            .write_all(response.as_bytes())
            .map_err(ProtoError::Write)?;
        output.write_all(b"\n").map_err(ProtoError::Write)?;
        output.flush().map_err(ProtoError::Write)?;

        if options.single_shot {
            state = LoopState::Stopped;
        }
    }
    Ok(())
}
