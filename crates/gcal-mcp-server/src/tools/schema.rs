//! JSON Schemas advertised through `tools/list`.
//!
//! These are the contract the agent sees; the request types in
//! [`super::requests`] enforce them.

use serde_json::{Value, json};

fn calendar_id() -> Value {
    json!({
        "type": "string",
        "description": "Calendar id; \"primary\" is the account's default calendar.",
        "default": "primary"
    })
}

fn send_updates(default: Option<&str>) -> Value {
    let mut schema = json!({
        "type": "string",
        "enum": ["all", "externalOnly", "none"],
        "description": "Who is emailed about the change."
    });
    if let Some(default) = default {
        schema["default"] = json!(default);
    }
    schema
}

fn datetime(description: &str) -> Value {
    json!({
        "type": "string",
        "description": format!(
            "{description} RFC3339 (2025-06-01T10:00:00-04:00), naive (2025-06-01T10:00:00, \
             interpreted in `timezone`) or a bare date."
        )
    })
}

/// Properties shared by create-event and update-event.
fn event_properties() -> serde_json::Map<String, Value> {
    let properties = json!({
        "summary": {"type": "string", "description": "Event title."},
        "description": {"type": "string"},
        "location": {"type": "string"},
        "colorId": {
            "type": "string",
            "enum": ["1", "2", "3", "4", "5", "6", "7", "8", "9", "10", "11"]
        },
        "start_datetime": datetime("Start time."),
        "end_datetime": datetime("End time, after the start."),
        "timezone": {
            "type": "string",
            "description": "IANA timezone for naive times. Defaults to the account timezone."
        },
        "recurrence": {
            "type": "array",
            "items": {"type": "string"},
            "description": "RRULE, EXRULE, RDATE or EXDATE lines, e.g. RRULE:FREQ=WEEKLY;COUNT=5."
        },
        "attendees": {
            "type": "array",
            "items": {
                "type": "object",
                "properties": {
                    "email": {"type": "string", "format": "email"},
                    "displayName": {"type": "string"},
                    "optional": {"type": "boolean"},
                    "responseStatus": {
                        "type": "string",
                        "enum": ["needsAction", "declined", "tentative", "accepted"]
                    },
                    "comment": {"type": "string"},
                    "additionalGuests": {"type": "integer", "minimum": 0}
                },
                "required": ["email"]
            }
        },
        "attachments": {
            "type": "array",
            "maxItems": 25,
            "items": {
                "type": "object",
                "properties": {
                    "fileUrl": {"type": "string"},
                    "fileId": {"type": "string", "description": "Google Drive file id."},
                    "title": {"type": "string"},
                    "mimeType": {"type": "string"}
                }
            }
        },
        "reminders": {
            "type": "object",
            "properties": {
                "useDefault": {"type": "boolean"},
                "overrides": {
                    "type": "array",
                    "maxItems": 5,
                    "items": {
                        "type": "object",
                        "properties": {
                            "method": {"type": "string", "enum": ["email", "popup"]},
                            "minutes": {"type": "integer", "minimum": 0, "maximum": 40320}
                        },
                        "required": ["method", "minutes"]
                    }
                }
            }
        },
        "visibility": {
            "type": "string",
            "enum": ["default", "public", "private", "confidential"]
        },
        "transparency": {
            "type": "string",
            "enum": ["opaque", "transparent"],
            "description": "transparent events do not block time."
        },
        "conferenceData": {
            "type": "object",
            "description": "Request a conference, e.g. {\"createRequest\": {\"requestId\": \"abc\", \"conferenceSolutionKey\": {\"type\": \"hangoutsMeet\"}}}.",
            "properties": {
                "createRequest": {
                    "type": "object",
                    "properties": {
                        "requestId": {"type": "string"},
                        "conferenceSolutionKey": {
                            "type": "object",
                            "properties": {"type": {"type": "string"}}
                        }
                    },
                    "required": ["requestId"]
                }
            }
        }
    });
    match properties {
        Value::Object(map) => map,
        _ => serde_json::Map::new(),
    }
}

pub fn empty() -> Value {
    json!({"type": "object", "properties": {}})
}

pub fn get_events() -> Value {
    json!({
        "type": "object",
        "properties": {
            "calendarId": calendar_id(),
            "timeMin": datetime("Lower bound (inclusive). Defaults to now."),
            "timeMax": datetime("Upper bound (exclusive). Defaults to 7 days after timeMin."),
            "maxResults": {"type": "integer", "minimum": 1, "maximum": 2500, "default": 250},
            "singleEvents": {
                "type": "boolean",
                "default": true,
                "description": "Expand recurring events into instances."
            },
            "orderBy": {
                "type": "string",
                "enum": ["startTime", "updated"],
                "description": "startTime requires singleEvents."
            }
        }
    })
}

pub fn get_current_date() -> Value {
    json!({
        "type": "object",
        "properties": {
            "timezone": {
                "type": "string",
                "description": "IANA timezone, e.g. Europe/Paris. Defaults to the account timezone."
            }
        }
    })
}

pub fn create_event() -> Value {
    let mut properties = event_properties();
    properties.insert("calendarId".into(), calendar_id());
    properties.insert("sendUpdates".into(), send_updates(None));
    json!({
        "type": "object",
        "properties": properties,
        "required": ["summary", "start_datetime", "end_datetime"]
    })
}

pub fn update_event() -> Value {
    let mut properties = event_properties();
    properties.insert("calendarId".into(), calendar_id());
    properties.insert(
        "eventId".into(),
        json!({"type": "string", "description": "Id of the event to change."}),
    );
    properties.insert("sendUpdates".into(), send_updates(Some("all")));
    json!({
        "type": "object",
        "properties": properties,
        "required": ["eventId"]
    })
}

pub fn delete_event() -> Value {
    json!({
        "type": "object",
        "properties": {
            "calendarId": calendar_id(),
            "eventId": {"type": "string"},
            "sendUpdates": send_updates(Some("all")),
            "notify_attendees": {
                "type": "boolean",
                "description": "false suppresses cancellation emails. sendUpdates wins if both are set."
            }
        },
        "required": ["eventId"]
    })
}

pub fn check_availability() -> Value {
    json!({
        "type": "object",
        "properties": {
            "items": {
                "type": "array",
                "minItems": 1,
                "maxItems": 50,
                "items": {
                    "type": "object",
                    "properties": {"id": {"type": "string"}},
                    "required": ["id"]
                },
                "description": "Calendars to query."
            },
            "timeMin": datetime("Window start."),
            "timeMax": datetime("Window end."),
            "timeZone": {
                "type": "string",
                "description": "IANA zone for times without an offset. Defaults to the account timezone."
            },
            "groupExpansionMax": {"type": "integer", "minimum": 1, "maximum": 100},
            "calendarExpansionMax": {"type": "integer", "minimum": 1, "maximum": 50}
        },
        "required": ["items", "timeMin", "timeMax"]
    })
}
