//! The HTTP entry point.
//!
//! Every form post lands here. A post is either a handshake, a poll for a
//! live session, or noise. Noise and failed polls get an empty `200` so the
//! gate looks the same to anyone scanning it.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use tracing::{debug, info, warn};

use super::session::Session;
use super::ControllerState;
use crate::error::{Error, Result};
use crate::handshake::{accept_handshake, Accepted};
use crate::obfuscation::{classify, Classification, FormParams};
use crate::wire::{Direction, Envelope};
use crate::{Command, HTTP_CONTENT_TYPE};

/// Handle one `POST` to the gate path.
pub(crate) async fn gate(State(state): State<Arc<ControllerState>>, body: Bytes) -> Response {
    state.metrics.increment_requests();

    let params: FormParams = match serde_urlencoded::from_bytes(&body) {
        Ok(params) => params,
        Err(e) => {
            debug!("Unparseable form body: {}", e);
            state.metrics.increment_ignored();
            return respond(StatusCode::OK, String::new());
        }
    };

    let classification = classify(&params, &state.config.sentinels, |id| {
        state.registry.contains_str(id)
    });

    match classification {
        Classification::Handshake { value } => handshake(&state, value).await,
        Classification::SessionData { id, value } => poll(&state, &id, value).await,
        Classification::None => {
            debug!(params = params.len(), "Request carries nothing for us");
            state.metrics.increment_ignored();
            respond(StatusCode::OK, String::new())
        }
    }
}

async fn handshake(state: &ControllerState, value: &str) -> Response {
    let Accepted {
        session_id,
        secret,
        reply,
    } = match accept_handshake(value) {
        Ok(accepted) => accepted,
        Err(e) => {
            debug!("Handshake rejected: {}", e);
            state.metrics.increment_handshake_failures();
            return server_error(&e);
        }
    };

    let session = state.registry.create_session(session_id, secret);
    if let Err(e) = state.register(session).await {
        info!(session = %session_id, "Session refused: {}", e);
        state.metrics.increment_handshake_failures();
        return server_error(&e);
    }

    state.metrics.increment_handshakes();
    info!(session = %session_id, "Session established");
    respond(StatusCode::OK, format!("{}\n", reply))
}

async fn poll(state: &ControllerState, id: &str, value: &str) -> Response {
    // The session may have gone between classification and now.
    let Some(session) = state.registry.lookup_str(id) else {
        state.metrics.increment_ignored();
        return respond(StatusCode::OK, String::new());
    };
    state.metrics.increment_polls();

    let result = match open(&session, id, value) {
        Ok(payload) => {
            session.touch();
            handle_data(state, &session, payload).await
        }
        Err(e) => Err(e),
    };

    match result {
        Ok(Some(body)) => respond(StatusCode::OK, format!("{}\n", body)),
        Ok(None) => respond(StatusCode::OK, String::new()),
        Err(e) => {
            if e.is_integrity_failure() {
                state.metrics.increment_integrity_failures();
                warn!(session = %session.id(), "Dropping session: {}", e);
            } else {
                debug!(session = %session.id(), "Poll failed: {}", e);
            }
            if e.closes_session() {
                state.registry.unregister_session(&session);
            }
            respond(StatusCode::OK, String::new())
        }
    }
}

/// Decrypt and verify an agent envelope without touching the session
/// buffers.
fn open(session: &Session, id: &str, value: &str) -> Result<Vec<u8>> {
    let envelope = Envelope::open(value, session.secret())?;
    envelope.verify_route(id, Direction::ToController)?;
    envelope.into_payload()
}

/// Apply one decrypted agent payload to its session.
///
/// Returns the sealed response envelope, or `None` when the reply body is
/// empty.
pub(crate) async fn handle_data(
    state: &ControllerState,
    session: &Session,
    payload: Vec<u8>,
) -> Result<Option<String>> {
    match Command::parse(&payload) {
        Some(Command::CheckStream) => {
            let outbound = session
                .drain_outbound(state.config.response_timeout)
                .await?;
            seal(state, session, &outbound)
        }
        Some(Command::TestConnection) => {
            if !session.is_connected() {
                return Err(Error::NotConnected);
            }
            seal(state, session, &payload)
        }
        Some(Command::Terminate) => {
            info!(session = %session.id(), "Agent terminated session");
            session.close();
            Ok(None)
        }
        None => {
            let outbound = session.exchange(&payload)?;
            state.metrics.add_bytes_received(payload.len() as u64);
            seal(state, session, &outbound)
        }
    }
}

fn seal(state: &ControllerState, session: &Session, data: &[u8]) -> Result<Option<String>> {
    if data.is_empty() {
        return Ok(None);
    }
    state.metrics.add_bytes_sent(data.len() as u64);

    let envelope = Envelope::with_compression(
        session.id().to_string(),
        Direction::ToAgent,
        data,
        state.config.compress,
    )?;
    envelope.seal(session.secret()).map(Some)
}

fn server_error(error: &Error) -> Response {
    respond(StatusCode::INTERNAL_SERVER_ERROR, format!("500 - {}", error))
}

fn respond(status: StatusCode, body: String) -> Response {
    (
        status,
        [
            (header::CONTENT_TYPE, HTTP_CONTENT_TYPE),
            (header::CONNECTION, "close"),
        ],
        body,
    )
        .into_response()
}
