//! Collection and entry handlers.
//!
//! Reads answer from a store snapshot. Writes dispatch one action, persist
//! the new state, then answer; a failed write-back is a 500 and the on-disk
//! file stays stale until the next successful write.
//!
//! Write statuses (200/201/404) come from the [`Transition`] the dispatch
//! returned, never from a separate read, so concurrent writes to the same
//! entry cannot both see it absent.
//!
//! [`Transition`]: crate::store::Transition

use axum::body::Bytes;
use url::Url;

use crate::api::id::random_id;
use crate::api::query::QueryFilter;
use crate::api::{param, ApiContext};
use crate::http::{status_line, BodyError, JsonRequest, JsonResponse, ResponseError};
use crate::observability::metrics;
use crate::routing::{HandlerResult, MatchedRoute};
use crate::store::{Action, Entry};

/// `GET /<key>`: the collection, optionally filtered by the query string.
pub async fn list(
    context: ApiContext,
    _request: JsonRequest,
    response: JsonResponse,
    route: MatchedRoute,
) -> HandlerResult {
    let key = param(&route, "key")?;
    let state = context.store.get_state();
    let Some(collection) = state.collection(key) else {
        response.end_as(status_line::NOT_FOUND)?;
        return Ok(());
    };

    let filter = QueryFilter::from_url(&route.url);
    let entries: Vec<&Entry> = collection
        .entries()
        .iter()
        .filter(|entry| filter.matches(entry))
        .collect();

    response.json(status_line::OK, &entries)?;
    Ok(())
}

/// `GET /<key>/<id>`
pub async fn get(
    context: ApiContext,
    _request: JsonRequest,
    response: JsonResponse,
    route: MatchedRoute,
) -> HandlerResult {
    let key = param(&route, "key")?;
    let id = param(&route, "id")?;
    let state = context.store.get_state();

    match state.entry(key, id) {
        Some(entry) => response.json(status_line::OK, entry)?,
        None => response.end_as(status_line::NOT_FOUND)?,
    }
    Ok(())
}

/// `POST /<key>`: insert under a fresh id; 201 with `Location`.
pub async fn create(
    context: ApiContext,
    mut request: JsonRequest,
    response: JsonResponse,
    route: MatchedRoute,
) -> HandlerResult {
    let key = param(&route, "key")?.to_string();
    let Some(body) = read_json_body(&mut request, &response).await? else {
        return Ok(());
    };

    let id = unique_id(&context, &key);
    let transition = context.store.dispatch(Action::Insert {
        key: key.clone(),
        id: id.clone(),
        body,
    });
    persist(&context).await?;

    let entry = transition.current.entry(&key, &id);
    let location = entry_location(&route.url, &key, &id);
    tracing::info!(collection = %key, id = %id, "Entry created");

    response.write_status(status_line::CREATED, &[("location", location.as_str())])?;
    response.end(serde_json::to_vec(&entry)?)?;
    Ok(())
}

/// `PUT /<key>/<id>`: replace or create; 200 or 201, both with `Location`.
pub async fn upsert(
    context: ApiContext,
    mut request: JsonRequest,
    response: JsonResponse,
    route: MatchedRoute,
) -> HandlerResult {
    let key = param(&route, "key")?.to_string();
    let id = param(&route, "id")?.to_string();
    let Some(body) = read_json_body(&mut request, &response).await? else {
        return Ok(());
    };

    let transition = context.store.dispatch(Action::Upsert {
        key: key.clone(),
        id: id.clone(),
        body,
    });
    persist(&context).await?;

    let existed = transition.previous.entry(&key, &id).is_some();
    let entry = transition.current.entry(&key, &id);
    let location = entry_location(&route.url, &key, &id);
    let status = if existed { status_line::OK } else { status_line::CREATED };
    tracing::info!(collection = %key, id = %id, replaced = existed, "Entry upserted");

    response.write_status(status, &[("location", location.as_str())])?;
    response.end(serde_json::to_vec(&entry)?)?;
    Ok(())
}

/// `PATCH /<key>/<id>`: merge fields into an existing entry; 404 if absent.
pub async fn patch(
    context: ApiContext,
    mut request: JsonRequest,
    response: JsonResponse,
    route: MatchedRoute,
) -> HandlerResult {
    let key = param(&route, "key")?.to_string();
    let id = param(&route, "id")?.to_string();
    let Some(body) = read_json_body(&mut request, &response).await? else {
        return Ok(());
    };

    let transition = context.store.dispatch(Action::PatchUpdate {
        key: key.clone(),
        id: id.clone(),
        body,
    });
    let Some(entry) = transition.current.entry(&key, &id) else {
        response.end_as(status_line::NOT_FOUND)?;
        return Ok(());
    };
    persist(&context).await?;

    tracing::info!(collection = %key, id = %id, "Entry patched");
    response.json(status_line::OK, entry)?;
    Ok(())
}

/// `DELETE /<key>/<id>`: always 204; only an existing entry triggers a write.
pub async fn delete(
    context: ApiContext,
    _request: JsonRequest,
    response: JsonResponse,
    route: MatchedRoute,
) -> HandlerResult {
    let key = param(&route, "key")?.to_string();
    let id = param(&route, "id")?.to_string();

    let transition = context.store.dispatch(Action::Remove {
        key: key.clone(),
        id: id.clone(),
    });
    if transition.previous.entry(&key, &id).is_some() {
        persist(&context).await?;
        tracing::info!(collection = %key, id = %id, "Entry removed");
    }

    response.write_status(status_line::NO_CONTENT, &[])?;
    response.end(Bytes::new())?;
    Ok(())
}

/// Parse an `application/json` object body, or answer 415/413/400 and
/// return `None`.
async fn read_json_body(
    request: &mut JsonRequest,
    response: &JsonResponse,
) -> Result<Option<Entry>, ResponseError> {
    if !request.is_json() {
        tracing::debug!(content_type = ?request.mime_type(), "Rejecting non-JSON body");
        response.end_as(status_line::UNSUPPORTED_MEDIA_TYPE)?;
        return Ok(None);
    }

    match request.parse_body_as_json_object().await {
        Ok(body) => Ok(Some(body)),
        Err(e @ BodyError::TooLarge { .. }) => {
            tracing::debug!(error = %e, "Rejecting oversized body");
            response.end_as(status_line::PAYLOAD_TOO_LARGE)?;
            Ok(None)
        }
        Err(e) => {
            tracing::debug!(error = %e, "Rejecting malformed body");
            response.end_as(status_line::BAD_REQUEST)?;
            Ok(None)
        }
    }
}

async fn persist(context: &ApiContext) -> HandlerResult {
    if let Err(e) = context.writer.persist(&context.store).await {
        metrics::record_write_failure();
        tracing::error!(path = ?context.writer.path(), error = %e, "Write-back failed");
        return Err(e.into());
    }
    Ok(())
}

fn unique_id(context: &ApiContext, key: &str) -> String {
    let state = context.store.get_state();
    loop {
        let id = random_id();
        if state.entry(key, &id).is_none() {
            return id;
        }
    }
}

/// Absolute URL of an entry, on the origin the request came in on.
fn entry_location(request_url: &Url, key: &str, id: &str) -> String {
    let mut url = request_url.clone();
    url.set_query(None);
    url.set_fragment(None);
    url.set_path(&format!("/{key}/{id}"));
    url.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_location_keeps_origin() {
        let url = Url::parse("http://example.com:5000/posts?x=1").unwrap();
        assert_eq!(entry_location(&url, "posts", "abc"), "http://example.com:5000/posts/abc");
    }
}
