//! JSON extraction from free-form model output.
//!
//! Models wrap their JSON in prose and markdown fences, so the payload
//! is located by scanning for the first opening and the last closing
//! delimiter of the expected shape and parsing that slice.

use log::{debug, trace, warn};
use serde_json::Value;

use crate::card::GeneratedCard;
use crate::catalog::SlotRequest;
use crate::error::Error;
use crate::request::Shape;

/// Pull one JSON value of `expected` shape out of `raw`.
///
/// Fails with `NoPayloadFound` when the opening delimiter is absent,
/// `MalformedPayload` when the slice is not valid JSON, and
/// `ShapeMismatch` when the slice sits inside a valid JSON value of
/// the other shape (e.g. `{"cards": [...]}` when an array was asked
/// for) or parses to the wrong type.
pub fn extract_json(raw: &str, expected: Shape) -> Result<Value, Error>
{   let (open, close) = expected.delimiters();

    let start = raw.find(open).ok_or_else(|| {
      debug!("No '{}' in response of {} bytes", open, raw.len());
      Error::NoPayloadFound { expected }
    })?;
    let end = raw.rfind(close)
      .filter(|end| *end > start)
      .ok_or_else(|| Error::MalformedPayload(format!(
        "no closing '{}' after offset {}", close, start
      )))?;

    if let Some(found) = enclosing_other_shape(raw, expected, start, end)
    {   return Err(Error::ShapeMismatch
        {   expected
          , found
        });
    }

    let slice = &raw[start..=end];
    trace!("Extracted JSON slice: {}", slice);
    let value: Value = serde_json::from_str(slice)
      .map_err(|e| Error::MalformedPayload(e.to_string()))?;

    match (expected, &value)
    {   (Shape::Object, Value::Object(_))
      | (Shape::Array, Value::Array(_)) => Ok(value)
      , (_, other) => Err(Error::ShapeMismatch
        {   expected
          , found: describe(other).to_string()
        })
    }
}

/// Name of the other shape when a valid value of that shape wraps the
/// `start..=end` span
fn enclosing_other_shape(
  raw: &str
, expected: Shape
, start: usize
, end: usize
) -> Option<String>
{   let other = expected.other();
    let (open, close) = other.delimiters();
    let outer_start = raw.find(open)?;
    let outer_end = raw.rfind(close)?;
    if outer_start >= start || outer_end <= end
    {   return None;
    }
    match serde_json::from_str::<Value>(&raw[outer_start..=outer_end])
    {   Ok(value) if describe(&value) == other.to_string() => {
          Some(other.to_string())
        }
      , _ => None
    }
}

fn describe(value: &Value) -> &'static str
{   match value
    {   Value::Object(_) => "object"
      , Value::Array(_) => "array"
      , Value::String(_) => "string"
      , Value::Number(_) => "number"
      , Value::Bool(_) => "boolean"
      , Value::Null => "null"
    }
}

/// Parse a single-slot reply into the card for `request`
pub fn parse_single_card(
  raw: &str
, request: &SlotRequest
) -> Result<GeneratedCard, Error>
{   let value = extract_json(raw, Shape::Object)?;
    if let Some(returned) = value.get("slot_id").and_then(Value::as_str)
    {   if returned.trim() != request.id()
        {   warn!(
              "Single card reply tagged {} for slot {}, keeping {}",
              returned,
              request.id(),
              request.id()
            );
        }
    }
    GeneratedCard::from_value(
      &value,
      request.id(),
      request.spec.rarity,
      &request.theme
    )
}

/// Parse a batch reply into cards tagged with slot ids.
///
/// Elements without a `slot_id` take the id of the request at the same
/// position. Non-object elements and untagged elements past the end of
/// the request list are dropped with a warning; reconciliation decides
/// what their absence means.
pub fn parse_batch(
  raw: &str
, requests: &[SlotRequest]
) -> Result<Vec<GeneratedCard>, Error>
{   let value = extract_json(raw, Shape::Array)?;
    let Value::Array(elements) = value else
    {   return Err(Error::ShapeMismatch
        {   expected: Shape::Array
          , found: "object".to_string()
        });
    };

    debug!(
      "Expected {} cards, received {} elements",
      requests.len(),
      elements.len()
    );

    let mut cards = Vec::with_capacity(elements.len());
    for (i, element) in elements.iter().enumerate()
    {   if !element.is_object()
        {   warn!("Batch element {} is not an object, skipping", i + 1);
            continue;
        }

        let tagged = element.get("slot_id")
          .and_then(Value::as_str)
          .filter(|id| !id.trim().is_empty())
          .map(|id| id.trim().to_string());

        let slot_id = match tagged
        {   Some(id) => id
          , None => match requests.get(i)
            {   Some(request) => {
                  warn!(
                    "Batch element {} has no slot_id, assigning {} by position",
                    i + 1,
                    request.id()
                  );
                  request.id().to_string()
                }
              , None => {
                  warn!(
                    "Batch element {} has no slot_id and no matching request, dropping",
                    i + 1
                  );
                  continue;
                }
            }
        };

        // Foreign ids fall back to the positional request for rarity and
        // theme; reconciliation rejects them anyway.
        let owner = requests.iter()
          .find(|r| r.id() == slot_id)
          .or_else(|| requests.get(i));
        let (rarity, theme) = match owner
        {   Some(request) => (request.spec.rarity, request.theme.as_str())
          , None => (crate::Rarity::Common, "")
        };

        let card = GeneratedCard::from_value(element, &slot_id, rarity, theme)?;
        debug!(
          "Parsed batch card {}: '{}' for slot {}",
          i + 1,
          card.name,
          card.slot_id
        );
        cards.push(card);
    }
    Ok(cards)
}
