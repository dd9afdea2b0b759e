use axum::response::sse::{Event, Sse};
use futures::{Stream, StreamExt};
use std::convert::Infallible;

use crate::session::{SseFrame, StreamSession};

/// Create an SSE response from a stream session.
///
/// The session emits its own keep-alive comments, so no axum keep-alive is
/// layered on top. Dropping the response (client gone) drops the session.
pub fn sse_response(session: StreamSession) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    frames_response(session.into_stream())
}

fn frames_response<S>(frames: S) -> Sse<impl Stream<Item = Result<Event, Infallible>>>
where
    S: Stream<Item = SseFrame> + Send + 'static,
{
    Sse::new(frames.map(|frame| Ok(to_event(frame))))
}

fn to_event(frame: SseFrame) -> Event {
    match frame {
        SseFrame::Comment(text) => Event::default().comment(text),
        SseFrame::Data(json) => Event::default().data(json),
    }
}
