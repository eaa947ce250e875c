//! Test fixtures shaped like the upstream documents.
//!
//! The schema mirrors the parts of the opencode configuration schema the
//! server navigates: plain properties, provider and `mcp` maps under
//! `additionalProperties`, `$ref` into `$defs`, and a union of entry types.

use serde_json::{json, Value};

/// A trimmed configuration schema.
#[must_use]
pub fn sample_schema() -> Value {
    json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "type": "object",
        "properties": {
            "$schema": {
                "type": "string",
                "description": "JSON schema reference for configuration validation"
            },
            "theme": {
                "type": "string",
                "description": "Theme name to use for the interface"
            },
            "model": {
                "type": "string",
                "description": "Model to use in the format of provider/model"
            },
            "share": {
                "enum": ["manual", "auto", "disabled"],
                "description": "Control sharing behavior"
            },
            "autoupdate": {
                "type": "boolean",
                "description": "Automatically update to the latest version"
            },
            "instructions": {
                "type": "array",
                "items": { "type": "string" },
                "description": "Additional instruction files or patterns to include"
            },
            "agent": {
                "type": "object",
                "description": "Agent configuration",
                "additionalProperties": { "$ref": "#/$defs/AgentConfig" }
            },
            "provider": {
                "type": "object",
                "description": "Custom provider configurations and model overrides",
                "additionalProperties": {
                    "type": "object",
                    "properties": {
                        "npm": { "type": "string" },
                        "name": { "type": "string" },
                        "models": {
                            "type": "object",
                            "description": "Model overrides keyed by model id",
                            "additionalProperties": { "type": "object" }
                        },
                        "options": {
                            "type": "object",
                            "description": "Provider options such as apiKey and baseURL"
                        }
                    }
                }
            },
            "mcp": {
                "type": "object",
                "description": "MCP (Model Context Protocol) server configurations",
                "additionalProperties": {
                    "anyOf": [
                        { "$ref": "#/$defs/McpLocalConfig" },
                        { "$ref": "#/$defs/McpRemoteConfig" }
                    ]
                }
            }
        },
        "additionalProperties": false,
        "$defs": {
            "AgentConfig": {
                "type": "object",
                "properties": {
                    "model": { "type": "string" },
                    "prompt": { "type": "string" },
                    "temperature": { "type": "number" }
                }
            },
            "McpLocalConfig": {
                "type": "object",
                "properties": {
                    "type": { "const": "local", "description": "Type of MCP server connection" },
                    "command": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Command and arguments to run the MCP server"
                    },
                    "environment": {
                        "type": "object",
                        "additionalProperties": { "type": "string" }
                    },
                    "enabled": { "type": "boolean" }
                },
                "required": ["type", "command"]
            },
            "McpRemoteConfig": {
                "type": "object",
                "properties": {
                    "type": { "const": "remote", "description": "Type of MCP server connection" },
                    "url": { "type": "string", "description": "URL of the remote MCP server" },
                    "headers": {
                        "type": "object",
                        "additionalProperties": { "type": "string" }
                    },
                    "enabled": { "type": "boolean" }
                },
                "required": ["type", "url"]
            }
        }
    })
}

/// A small `api.json`-style models catalog with three providers.
#[must_use]
pub fn sample_models_catalog() -> Value {
    json!({
        "anthropic": {
            "id": "anthropic",
            "name": "Anthropic",
            "env": ["ANTHROPIC_API_KEY"],
            "npm": "@ai-sdk/anthropic",
            "doc": "https://docs.anthropic.com/en/docs/about-claude/models",
            "models": {
                "claude-sonnet-4": {
                    "id": "claude-sonnet-4",
                    "name": "Claude Sonnet 4",
                    "attachment": true,
                    "reasoning": true,
                    "tool_call": true,
                    "temperature": true,
                    "knowledge": "2025-03",
                    "release_date": "2025-05-22",
                    "modalities": { "input": ["text", "image"], "output": ["text"] },
                    "open_weights": false,
                    "cost": { "input": 3.0, "output": 15.0, "cache_read": 0.3, "cache_write": 3.75 },
                    "limit": { "context": 200000, "output": 64000 }
                },
                "claude-3-5-haiku": {
                    "id": "claude-3-5-haiku",
                    "name": "Claude Haiku 3.5",
                    "attachment": true,
                    "reasoning": false,
                    "tool_call": true,
                    "temperature": true,
                    "release_date": "2024-10-22",
                    "open_weights": false,
                    "cost": { "input": 0.8, "output": 4.0 },
                    "limit": { "context": 200000, "output": 8192 }
                }
            }
        },
        "openai": {
            "id": "openai",
            "name": "OpenAI",
            "env": ["OPENAI_API_KEY"],
            "npm": "@ai-sdk/openai",
            "models": {
                "gpt-4o": {
                    "id": "gpt-4o",
                    "name": "GPT-4o",
                    "attachment": true,
                    "reasoning": false,
                    "tool_call": true,
                    "temperature": true,
                    "release_date": "2024-05-13",
                    "cost": { "input": 2.5, "output": 10.0 },
                    "limit": { "context": 128000, "output": 16384 }
                },
                "gpt-4o-mini": {
                    "name": "GPT-4o mini",
                    "attachment": true,
                    "tool_call": true,
                    "temperature": true,
                    "release_date": "2024-07-18",
                    "cost": { "input": 0.15, "output": 0.6 },
                    "limit": { "context": 128000, "output": 16384 },
                    "experimental_field": "ignored"
                }
            }
        },
        "ollama": {
            "id": "ollama",
            "name": "Ollama",
            "env": [],
            "api": "http://localhost:11434/v1",
            "models": {
                "llama3.1": {
                    "id": "llama3.1",
                    "name": "Llama 3.1",
                    "tool_call": true,
                    "open_weights": true,
                    "limit": { "context": 131072, "output": 8192 }
                }
            }
        }
    })
}

/// First page of a registry listing, with a cursor to page two.
#[must_use]
pub fn sample_registry_page() -> Value {
    json!({
        "servers": [
            {
                "server": {
                    "name": "io.github.acme/filesystem",
                    "description": "Read and write local files",
                    "version": "1.2.0",
                    "repository": { "url": "https://github.com/acme/filesystem-mcp", "source": "github" },
                    "packages": [
                        {
                            "registryType": "npm",
                            "identifier": "@acme/fs-mcp",
                            "version": "1.2.0",
                            "environmentVariables": [
                                { "name": "FS_ROOT", "description": "Root directory", "isRequired": true },
                                { "name": "FS_LOG", "isRequired": false }
                            ]
                        }
                    ]
                },
                "_meta": { "io.modelcontextprotocol.registry/official": { "status": "active" } }
            },
            {
                "name": "com.example/docs",
                "description": "Hosted documentation search",
                "version": "0.3.1",
                "remotes": [
                    { "type": "streamable-http", "url": "https://docs.example.com/mcp" }
                ]
            },
            { "description": "entry without a name" }
        ],
        "metadata": { "nextCursor": "page-2", "count": 3 }
    })
}

/// Second and last page of a registry listing.
#[must_use]
pub fn sample_registry_page_two() -> Value {
    json!({
        "servers": [
            {
                "server": {
                    "name": "io.github.acme/git",
                    "description": "Git repository inspection",
                    "packages": [
                        { "registry_name": "pypi", "name": "acme-git-mcp" }
                    ]
                }
            },
            {
                "server": {
                    "name": "io.github.acme/filesystem",
                    "description": "Duplicate listing"
                }
            }
        ],
        "metadata": { "count": 2 }
    })
}
