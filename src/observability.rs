use biometrics::{Collector, Counter, Moments};

pub(crate) static CLIENT_REQUESTS: Counter = Counter::new("pybot.client.requests");
pub(crate) static CLIENT_TRANSPORT_ERRORS: Counter =
    Counter::new("pybot.client.transport_errors");
pub(crate) static CLIENT_FORMAT_ERRORS: Counter = Counter::new("pybot.client.format_errors");
pub(crate) static CLIENT_EMPTY_INPUTS: Counter = Counter::new("pybot.client.empty_inputs");
pub(crate) static CLIENT_REQUEST_DURATION: Moments =
    Moments::new("pybot.client.request_duration_seconds");

pub(crate) static FORMAT_RESPONSES: Counter = Counter::new("pybot.format.responses");
pub(crate) static FORMAT_CODE_BLOCKS: Counter = Counter::new("pybot.format.code_blocks");
pub(crate) static FORMAT_UNCLOSED_FENCES: Counter =
    Counter::new("pybot.format.unclosed_fences");

pub(crate) static REVEAL_TOKENS: Counter = Counter::new("pybot.reveal.tokens");

pub(crate) static SESSION_TURNS: Counter = Counter::new("pybot.session.turns");
pub(crate) static SESSION_INTERRUPTS: Counter = Counter::new("pybot.session.interrupts");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&CLIENT_REQUESTS);
    collector.register_counter(&CLIENT_TRANSPORT_ERRORS);
    collector.register_counter(&CLIENT_FORMAT_ERRORS);
    collector.register_counter(&CLIENT_EMPTY_INPUTS);
    collector.register_moments(&CLIENT_REQUEST_DURATION);

    collector.register_counter(&FORMAT_RESPONSES);
    collector.register_counter(&FORMAT_CODE_BLOCKS);
    collector.register_counter(&FORMAT_UNCLOSED_FENCES);

    collector.register_counter(&REVEAL_TOKENS);

    collector.register_counter(&SESSION_TURNS);
    collector.register_counter(&SESSION_INTERRUPTS);
}
