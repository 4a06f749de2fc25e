//! The request/response payload convention.
//!
//! Remote-procedure bodies are a shape layered on top of framing, not a
//! framing replacement: a request is `{"method": name, "args": {...},
//! "tag"?: int}` and a response is `{"result": "success" | message,
//! "args": {...}}`. These helpers build and pick apart that shape.

use crate::error::ProtoError;
use riptide_variant::Variant;

pub const RESULT_SUCCESS: &str = "success";

/// Builds a request body.
pub fn request(method: &str, args: Variant<'static>, tag: Option<i64>) -> Variant<'static> {
    let mut entries = vec![
        ("method".into(), Variant::str(method.as_bytes().to_vec())),
        ("args".into(), args),
    ];
    if let Some(tag) = tag {
        entries.push(("tag".into(), Variant::Int(tag)));
    }
    Variant::Dict(entries)
}

/// Builds a success response body.
pub fn response_success(args: Variant<'static>) -> Variant<'static> {
    response(RESULT_SUCCESS, args)
}

/// Builds a failure response; `message` is the human-readable reason.
pub fn response(message: &str, args: Variant<'static>) -> Variant<'static> {
    Variant::Dict(vec![
        ("result".into(), Variant::str(message.as_bytes().to_vec())),
        ("args".into(), args),
    ])
}

pub struct Request<'v, 'a> {
    pub method: &'v str,
    pub args: &'v Variant<'a>,
    pub tag: Option<i64>,
}

pub struct Response<'v, 'a> {
    /// `None` means success; otherwise the failure message.
    pub error: Option<&'v str>,
    pub args: &'v Variant<'a>,
}

/// Picks a request body apart. `method` and `args` are required; a missing
/// or non-integer `tag` is treated as absent.
pub fn parse_request<'v, 'a>(body: &'v Variant<'a>) -> Result<Request<'v, 'a>, ProtoError> {
    let method = body.get_str("method").ok_or(ProtoError::MalformedMessage)?;
    let args = body.get("args").ok_or(ProtoError::MalformedMessage)?;
    let tag = body.get_int("tag").filter(|t| *t > 0);
    Ok(Request { method, args, tag })
}

pub fn parse_response<'v, 'a>(body: &'v Variant<'a>) -> Result<Response<'v, 'a>, ProtoError> {
    let result = body.get_str("result").ok_or(ProtoError::MalformedMessage)?;
    let args = body.get("args").ok_or(ProtoError::MalformedMessage)?;
    let error = (result != RESULT_SUCCESS).then_some(result);
    Ok(Response { error, args })
}
