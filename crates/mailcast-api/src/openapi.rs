//! OpenAPI documentation
//!
//! Serves the OpenAPI 3.0 description of the Mailcast API and a Swagger UI
//! page that renders it.

use axum::{
    response::{Html, IntoResponse},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};

/// Create OpenAPI routes
pub fn create_openapi_routes() -> Router {
    Router::new()
        .route("/openapi.json", get(openapi_json))
        .route("/docs", get(swagger_ui))
}

async fn openapi_json() -> impl IntoResponse {
    Json(get_openapi_spec())
}

async fn swagger_ui() -> impl IntoResponse {
    Html(SWAGGER_UI_HTML)
}

fn schema_ref(name: &str) -> Value {
    json!({ "$ref": format!("#/components/schemas/{}", name) })
}

fn json_body(schema: Value) -> Value {
    json!({ "content": { "application/json": { "schema": schema } } })
}

fn ok(description: &str, schema: Value) -> Value {
    let mut response = json_body(schema);
    response["description"] = json!(description);
    response
}

fn id_param() -> Value {
    json!({
        "name": "id",
        "in": "path",
        "required": true,
        "schema": {"type": "string", "format": "uuid"}
    })
}

fn error_responses(codes: &[(&str, &str)]) -> serde_json::Map<String, Value> {
    codes
        .iter()
        .map(|(code, description)| {
            let mut response = json_body(schema_ref("ErrorResponse"));
            response["description"] = json!(description);
            (code.to_string(), response)
        })
        .collect()
}

/// Standard CRUD paths for one owned entity
fn crud_paths(tag: &str, entity: &str, input: &str, update: &str) -> (Value, Value) {
    let list_schema = json!({"type": "array", "items": schema_ref(entity)});
    let mut collection_errors = error_responses(&[("401", "Missing or invalid token"), ("403", "Permission denied")]);
    collection_errors.insert("200".into(), ok(&format!("{} list", entity), list_schema));

    let mut create_errors = error_responses(&[("401", "Missing or invalid token"), ("422", "Validation failed")]);
    create_errors.insert("201".into(), ok(&format!("{} created", entity), schema_ref(entity)));

    let collection = json!({
        "get": {
            "tags": [tag],
            "summary": format!("List visible {}s", entity.to_lowercase()),
            "security": [{"bearerAuth": []}],
            "responses": collection_errors
        },
        "post": {
            "tags": [tag],
            "summary": format!("Create a {}", entity.to_lowercase()),
            "security": [{"bearerAuth": []}],
            "requestBody": json_body(schema_ref(input)),
            "responses": create_errors
        }
    });

    let not_visible = [
        ("401", "Missing or invalid token"),
        ("403", "Not the owner"),
        ("404", "Not found"),
    ];
    let mut get_responses = error_responses(&not_visible);
    get_responses.insert("200".into(), ok(entity, schema_ref(entity)));
    let mut update_responses = error_responses(&not_visible);
    update_responses.insert("200".into(), ok(&format!("{} updated", entity), schema_ref(entity)));
    update_responses.extend(error_responses(&[("422", "Validation failed")]));
    let mut delete_responses = error_responses(&not_visible);
    delete_responses.insert("204".into(), json!({"description": "Deleted"}));

    let item = json!({
        "parameters": [id_param()],
        "get": {
            "tags": [tag],
            "summary": format!("Get a {}", entity.to_lowercase()),
            "security": [{"bearerAuth": []}],
            "responses": get_responses
        },
        "put": {
            "tags": [tag],
            "summary": format!("Update a {}", entity.to_lowercase()),
            "security": [{"bearerAuth": []}],
            "requestBody": json_body(schema_ref(update)),
            "responses": update_responses
        },
        "delete": {
            "tags": [tag],
            "summary": format!("Delete a {}", entity.to_lowercase()),
            "security": [{"bearerAuth": []}],
            "responses": delete_responses
        }
    });

    (collection, item)
}

/// Get the OpenAPI specification as JSON
pub fn get_openapi_spec() -> Value {
    let (recipients, recipient) = crud_paths("recipients", "Recipient", "RecipientInput", "UpdateRecipient");
    let (messages, message) = crud_paths("messages", "Message", "MessageInput", "UpdateMessage");
    let (mailings, mut mailing) = crud_paths("mailings", "Mailing", "MailingInput", "UpdateMailing");
    mailing["get"]["responses"]["200"] = ok("Mailing with message, recipients and attempts", schema_ref("MailingDetail"));

    let mut send_responses = error_responses(&[
        ("401", "Missing or invalid token"),
        ("403", "Only the owner can launch a mailing"),
        ("404", "Mailing not found"),
        ("409", "Mailing is not in the created state"),
    ]);
    send_responses.insert("200".into(), ok("Mailing sent, attempt recorded", schema_ref("LaunchOutcome")));

    let mut stop_responses = error_responses(&[
        ("401", "Missing or invalid token"),
        ("403", "The mailing.stop permission is required"),
        ("404", "Mailing not found"),
    ]);
    stop_responses.insert("200".into(), ok("Mailing stopped", schema_ref("Mailing")));

    json!({
        "openapi": "3.0.3",
        "info": {
            "title": "Mailcast API",
            "description": "REST API for Mailcast, a multi-user bulk mailing service.\n\n## Authentication\n\nEndpoints outside `/health`, `/api/v1/accounts` and `/api/v1/contacts` require a session token from `POST /api/v1/accounts/login`.\n\n- **Bearer**: `Authorization: Bearer <token>`",
            "version": "1.0.0",
            "license": {
                "name": "Apache-2.0",
                "url": "https://www.apache.org/licenses/LICENSE-2.0"
            }
        },
        "servers": [
            {"url": "/", "description": "Mailcast"}
        ],
        "tags": [
            {"name": "health", "description": "Health check endpoints"},
            {"name": "accounts", "description": "Registration, login and password recovery"},
            {"name": "recipients", "description": "Recipient directory"},
            {"name": "messages", "description": "Message catalog"},
            {"name": "mailings", "description": "Mailings and their launch"},
            {"name": "attempts", "description": "Send attempt log"},
            {"name": "users", "description": "User administration"},
            {"name": "misc", "description": "Dashboard statistics and contact form"}
        ],
        "paths": {
            "/health": {
                "get": {
                    "tags": ["health"],
                    "summary": "Basic health check",
                    "operationId": "health",
                    "responses": {"200": ok("Service is healthy", schema_ref("HealthResponse"))}
                }
            },
            "/health/live": {
                "get": {
                    "tags": ["health"],
                    "summary": "Liveness probe",
                    "operationId": "liveness",
                    "responses": {"200": {"description": "Service is alive"}}
                }
            },
            "/health/ready": {
                "get": {
                    "tags": ["health"],
                    "summary": "Readiness probe",
                    "operationId": "readiness",
                    "responses": {
                        "200": {"description": "Service is ready"},
                        "503": {"description": "Database is unreachable"}
                    }
                }
            },
            "/api/v1/accounts/register": {
                "post": {
                    "tags": ["accounts"],
                    "summary": "Register an inactive account and mail a confirmation link",
                    "requestBody": json_body(schema_ref("Registration")),
                    "responses": {
                        "201": ok("Account created", schema_ref("User")),
                        "422": ok("Validation failed", schema_ref("ErrorResponse"))
                    }
                }
            },
            "/api/v1/accounts/confirm/{token}": {
                "get": {
                    "tags": ["accounts"],
                    "summary": "Confirm an email address and activate the account",
                    "parameters": [{"name": "token", "in": "path", "required": true, "schema": {"type": "string"}}],
                    "responses": {
                        "200": ok("Account activated", schema_ref("User")),
                        "404": ok("Unknown token", schema_ref("ErrorResponse"))
                    }
                }
            },
            "/api/v1/accounts/login": {
                "post": {
                    "tags": ["accounts"],
                    "summary": "Exchange credentials for a bearer token",
                    "requestBody": json_body(json!({
                        "type": "object",
                        "required": ["email", "password"],
                        "properties": {
                            "email": {"type": "string"},
                            "password": {"type": "string"}
                        }
                    })),
                    "responses": {
                        "200": ok("Session issued", schema_ref("Session")),
                        "401": ok("Invalid credentials", schema_ref("ErrorResponse"))
                    }
                }
            },
            "/api/v1/accounts/logout": {
                "post": {
                    "tags": ["accounts"],
                    "summary": "Revoke the current token",
                    "security": [{"bearerAuth": []}],
                    "responses": {"204": {"description": "Token revoked"}}
                }
            },
            "/api/v1/accounts/password-recovery": {
                "post": {
                    "tags": ["accounts"],
                    "summary": "Mail a one-time password reset code",
                    "requestBody": json_body(json!({
                        "type": "object",
                        "required": ["email"],
                        "properties": {"email": {"type": "string"}}
                    })),
                    "responses": {
                        "202": ok("Reset code sent", schema_ref("MessageResponse")),
                        "422": ok("Unknown email", schema_ref("ErrorResponse")),
                        "502": ok("Mail could not be sent", schema_ref("ErrorResponse"))
                    }
                }
            },
            "/api/v1/accounts/password-reset": {
                "post": {
                    "tags": ["accounts"],
                    "summary": "Set a new password with a reset code",
                    "requestBody": json_body(json!({
                        "type": "object",
                        "required": ["token", "password", "password_confirm"],
                        "properties": {
                            "token": {"type": "string"},
                            "password": {"type": "string"},
                            "password_confirm": {"type": "string"}
                        }
                    })),
                    "responses": {
                        "200": ok("Password changed", schema_ref("MessageResponse")),
                        "422": ok("Invalid or expired code", schema_ref("ErrorResponse"))
                    }
                }
            },
            "/api/v1/contacts": {
                "post": {
                    "tags": ["misc"],
                    "summary": "Send the contact form to the site owners",
                    "requestBody": json_body(json!({
                        "type": "object",
                        "required": ["name", "message"],
                        "properties": {
                            "name": {"type": "string"},
                            "phone": {"type": "string"},
                            "message": {"type": "string"}
                        }
                    })),
                    "responses": {
                        "200": ok("Thank-you text", schema_ref("MessageResponse")),
                        "502": ok("Mail could not be sent", schema_ref("ErrorResponse"))
                    }
                }
            },
            "/api/v1/stats": {
                "get": {
                    "tags": ["misc"],
                    "summary": "Dashboard counters",
                    "security": [{"bearerAuth": []}],
                    "responses": {"200": ok("Counters", schema_ref("MailingStats"))}
                }
            },
            "/api/v1/recipients": recipients,
            "/api/v1/recipients/{id}": recipient,
            "/api/v1/messages": messages,
            "/api/v1/messages/{id}": message,
            "/api/v1/mailings": mailings,
            "/api/v1/mailings/{id}": mailing,
            "/api/v1/mailings/{id}/send": {
                "post": {
                    "tags": ["mailings"],
                    "summary": "Launch a created mailing",
                    "security": [{"bearerAuth": []}],
                    "parameters": [id_param()],
                    "responses": send_responses
                }
            },
            "/api/v1/mailings/{id}/stop": {
                "post": {
                    "tags": ["mailings"],
                    "summary": "Stop a mailing",
                    "security": [{"bearerAuth": []}],
                    "parameters": [id_param()],
                    "responses": stop_responses
                }
            },
            "/api/v1/attempts": {
                "get": {
                    "tags": ["attempts"],
                    "summary": "List visible send attempts",
                    "security": [{"bearerAuth": []}],
                    "responses": {
                        "200": ok("Attempts", json!({"type": "array", "items": schema_ref("MailingAttempt")}))
                    }
                }
            },
            "/api/v1/users": {
                "get": {
                    "tags": ["users"],
                    "summary": "List users (managers and superusers)",
                    "security": [{"bearerAuth": []}],
                    "parameters": [
                        {"name": "limit", "in": "query", "schema": {"type": "integer", "default": 50}},
                        {"name": "offset", "in": "query", "schema": {"type": "integer", "default": 0}}
                    ],
                    "responses": {
                        "200": ok("Users", json!({"type": "array", "items": schema_ref("User")})),
                        "403": ok("Permission denied", schema_ref("ErrorResponse"))
                    }
                }
            },
            "/api/v1/users/{id}": {
                "parameters": [id_param()],
                "get": {
                    "tags": ["users"],
                    "summary": "User detail with groups and permissions (superusers)",
                    "security": [{"bearerAuth": []}],
                    "responses": {"200": ok("User", schema_ref("UserDetail"))}
                },
                "put": {
                    "tags": ["users"],
                    "summary": "Update a user's profile (superusers)",
                    "security": [{"bearerAuth": []}],
                    "requestBody": json_body(schema_ref("UpdateUser")),
                    "responses": {"200": ok("User updated", schema_ref("User"))}
                }
            },
            "/api/v1/users/{id}/block": {
                "post": {
                    "tags": ["users"],
                    "summary": "Deactivate a user and revoke their sessions",
                    "security": [{"bearerAuth": []}],
                    "parameters": [id_param()],
                    "responses": {"200": ok("User blocked", schema_ref("User"))}
                }
            },
            "/api/v1/users/{id}/unblock": {
                "post": {
                    "tags": ["users"],
                    "summary": "Reactivate a user",
                    "security": [{"bearerAuth": []}],
                    "parameters": [id_param()],
                    "responses": {"200": ok("User unblocked", schema_ref("User"))}
                }
            },
            "/api/v1/users/{id}/roles": {
                "put": {
                    "tags": ["users"],
                    "summary": "Replace a user's groups and permissions (superusers)",
                    "security": [{"bearerAuth": []}],
                    "parameters": [id_param()],
                    "requestBody": json_body(schema_ref("UserRoles")),
                    "responses": {"200": ok("Roles replaced", schema_ref("UserDetail"))}
                }
            }
        },
        "components": {
            "securitySchemes": {
                "bearerAuth": {"type": "http", "scheme": "bearer"}
            },
            "schemas": components()
        }
    })
}

fn components() -> Value {
    let uuid = json!({"type": "string", "format": "uuid"});
    let nullable_uuid = json!({"type": "string", "format": "uuid", "nullable": true});
    let datetime = json!({"type": "string", "format": "date-time"});
    let nullable_datetime = json!({"type": "string", "format": "date-time", "nullable": true});

    json!({
        "ErrorResponse": {
            "type": "object",
            "properties": {
                "error": {"type": "string", "example": "not_found"},
                "message": {"type": "string"}
            }
        },
        "MessageResponse": {
            "type": "object",
            "properties": {"message": {"type": "string"}}
        },
        "HealthResponse": {
            "type": "object",
            "properties": {"status": {"type": "string", "example": "healthy"}}
        },
        "Registration": {
            "type": "object",
            "required": ["email", "password", "password_confirm", "first_name", "last_name"],
            "properties": {
                "email": {"type": "string"},
                "password": {"type": "string", "minLength": 8},
                "password_confirm": {"type": "string"},
                "first_name": {"type": "string"},
                "last_name": {"type": "string"},
                "phone_number": {"type": "string"},
                "country": {"type": "string"}
            }
        },
        "Session": {
            "type": "object",
            "properties": {
                "token": {"type": "string"},
                "expires_at": datetime,
                "user": schema_ref("User")
            }
        },
        "User": {
            "type": "object",
            "properties": {
                "id": uuid,
                "email": {"type": "string"},
                "first_name": {"type": "string"},
                "last_name": {"type": "string"},
                "phone_number": {"type": "string", "nullable": true},
                "country": {"type": "string"},
                "is_active": {"type": "boolean"},
                "is_superuser": {"type": "boolean"},
                "email_confirmed": {"type": "boolean"},
                "created_at": datetime
            }
        },
        "UpdateUser": {
            "type": "object",
            "properties": {
                "email": {"type": "string"},
                "first_name": {"type": "string"},
                "last_name": {"type": "string"},
                "phone_number": {"type": "string"},
                "country": {"type": "string"}
            }
        },
        "UserRoles": {
            "type": "object",
            "properties": {
                "groups": {"type": "array", "items": {"type": "string", "enum": ["managers", "users"]}},
                "permissions": {"type": "array", "items": {"type": "string", "enum": ["mailing.stop"]}}
            }
        },
        "UserDetail": {
            "allOf": [schema_ref("User"), schema_ref("UserRoles")]
        },
        "Recipient": {
            "type": "object",
            "properties": {
                "id": uuid,
                "email": {"type": "string", "maxLength": 150},
                "name": {"type": "string", "maxLength": 150},
                "comment": {"type": "string", "nullable": true, "maxLength": 255},
                "photo": {"type": "string", "nullable": true},
                "is_active": {"type": "boolean"},
                "owner_id": nullable_uuid
            }
        },
        "RecipientInput": {
            "type": "object",
            "required": ["email", "name"],
            "properties": {
                "email": {"type": "string"},
                "name": {"type": "string"},
                "comment": {"type": "string"},
                "photo": {"type": "string"},
                "is_active": {"type": "boolean"}
            }
        },
        "UpdateRecipient": {
            "type": "object",
            "properties": {
                "email": {"type": "string"},
                "name": {"type": "string"},
                "comment": {"type": "string"},
                "photo": {"type": "string"},
                "is_active": {"type": "boolean"}
            }
        },
        "Message": {
            "type": "object",
            "properties": {
                "id": uuid,
                "subject": {"type": "string", "maxLength": 255},
                "body": {"type": "string", "maxLength": 800},
                "owner_id": nullable_uuid
            }
        },
        "MessageInput": {
            "type": "object",
            "required": ["subject", "body"],
            "properties": {
                "subject": {"type": "string"},
                "body": {"type": "string"}
            }
        },
        "UpdateMessage": {
            "type": "object",
            "properties": {
                "subject": {"type": "string"},
                "body": {"type": "string"}
            }
        },
        "Mailing": {
            "type": "object",
            "properties": {
                "id": uuid,
                "first_sending": nullable_datetime,
                "end_sending": nullable_datetime,
                "status": {"type": "string", "enum": ["created", "launched", "completed", "stopped"]},
                "message_id": uuid,
                "is_active": {"type": "boolean"},
                "owner_id": nullable_uuid,
                "created_at": datetime
            }
        },
        "MailingInput": {
            "type": "object",
            "required": ["message_id"],
            "properties": {
                "message_id": uuid,
                "recipient_ids": {"type": "array", "items": uuid},
                "is_active": {"type": "boolean"}
            }
        },
        "UpdateMailing": {
            "type": "object",
            "properties": {
                "message_id": uuid,
                "recipient_ids": {"type": "array", "items": uuid},
                "is_active": {"type": "boolean"}
            }
        },
        "MailingAttempt": {
            "type": "object",
            "properties": {
                "id": uuid,
                "attempted_at": datetime,
                "status": {"type": "string", "enum": ["success", "failure"]},
                "server_response": {"type": "string"},
                "mailing_id": uuid,
                "owner_id": nullable_uuid
            }
        },
        "MailingDetail": {
            "allOf": [
                schema_ref("Mailing"),
                {
                    "type": "object",
                    "properties": {
                        "message": schema_ref("Message"),
                        "recipients": {"type": "array", "items": schema_ref("Recipient")},
                        "attempts": {"type": "array", "items": schema_ref("MailingAttempt")}
                    }
                }
            ]
        },
        "LaunchOutcome": {
            "type": "object",
            "properties": {
                "mailing": schema_ref("Mailing"),
                "attempt": schema_ref("MailingAttempt")
            }
        },
        "MailingStats": {
            "type": "object",
            "properties": {
                "total_mailings": {"type": "integer"},
                "active_mailings": {"type": "integer"},
                "unique_recipients": {"type": "integer"}
            }
        }
    })
}

/// Swagger UI HTML template
const SWAGGER_UI_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Mailcast API</title>
    <link rel="stylesheet" href="https://unpkg.com/swagger-ui-dist@5.9.0/swagger-ui.css" />
</head>
<body>
    <div id="swagger-ui"></div>
    <script src="https://unpkg.com/swagger-ui-dist@5.9.0/swagger-ui-bundle.js"></script>
    <script>
        window.onload = function() {
            SwaggerUIBundle({ url: "/openapi.json", dom_id: '#swagger-ui' });
        };
    </script>
</body>
</html>"#;
