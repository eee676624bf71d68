//! Signature help for the call around the cursor.

use serde::Serialize;

use super::qualified_name;
use super::text::call_context;
use crate::indexing::DocumentManager;
use crate::semantic::resolve_in;
use crate::types::{DocumentId, Position};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureHelp {
    pub label: String,
    pub parameters: Vec<String>,
    /// `None` when the cursor is on an implicit `self` argument.
    pub active_parameter: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documentation: Option<String>,
}

pub fn signature_help(
    documents: &DocumentManager,
    document: &DocumentId,
    position: Position,
) -> Option<SignatureHelp> {
    let index = documents.get(document)?;
    let offset = index.offset(position);
    let call = call_context(&index.text, offset)?;
    let handle = resolve_in(&index, &call.callee, call.callee_span.start).into_first()?;
    let symbol = handle.symbol();
    let function = symbol.ty.as_function()?;

    // `obj:f(a)` passes `obj` as the first declared parameter of a function
    // declared with `.`, and `T.m(obj, a)` does the reverse for methods
    let active_parameter = match (call.is_method_call(), function.is_method) {
        (true, false) => Some(call.active_parameter + 1),
        (false, true) => call.active_parameter.checked_sub(1),
        _ => Some(call.active_parameter),
    };

    let label = format!(
        "{}({})",
        qualified_name(&handle.index, symbol),
        function.params.join(", ")
    );
    Some(SignatureHelp {
        label,
        parameters: function.params.clone(),
        active_parameter,
        documentation: symbol.doc_comment.clone(),
    })
}
