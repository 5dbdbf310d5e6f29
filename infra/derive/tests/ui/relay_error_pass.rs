use relay_derive::relay_error;
use std::borrow::Cow;

#[relay_error]
pub enum DemoError {
    #[error("IO error{}: {source}", format_context(.context))]
    Io {
        #[source]
        source: std::io::Error,
        context: Option<Cow<'static, str>>,
    },

    #[error("Channel closed{}: {message}", format_context(.context))]
    Closed { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Internal error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

fn read(path: &str) -> Result<Vec<u8>, DemoError> {
    std::fs::read(path).context("Reading demo file")
}

fn closed() -> Result<(), DemoError> {
    Err(DemoError::Closed { message: "hub".into(), context: None }).context("Emitting")
}

fn main() {
    let _ = read("/definitely/not/here");
    let _ = closed();
    let internal: DemoError = "boom".into();
    let _ = internal.to_string();
}
