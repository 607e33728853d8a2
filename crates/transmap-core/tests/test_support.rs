//! Shared test support utilities for integration tests

#![allow(dead_code)]

use serde_json::{json, Value};
use transmap_core::{key_chain, schema_to_type_tree, KeyChain, StaticSchemaProvider};

/// Key chain from a dotted id
pub fn chain(dotted: &str) -> KeyChain {
    key_chain(dotted.split('.'))
}

/// Petstore `getPet` response body schema
pub fn pet_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "id": {"type": "integer"},
            "name": {"type": "string"},
            "weight": {"type": "number"},
            "tags": {"type": "array", "items": {"type": "string"}}
        }
    })
}

/// Inventory `fetchAnimal` response body schema
pub fn animal_schema() -> Value {
    json!({
        "allOf": [
            {"type": "object", "properties": {"id": {"type": "integer"}, "name": {"type": "string"}}},
            {"type": "object", "properties": {"weightGrams": {"type": "number"}}}
        ]
    })
}

/// Schemas of the shop -> inventory -> warehouse scenario
pub fn schemas() -> StaticSchemaProvider {
    StaticSchemaProvider::new()
        .with_request(
            "inventory_fetchAnimal_200",
            json!({"parameters": {"animalId": "integer"}}),
        )
        .with_response(
            "petstore_getPet_200",
            json!({"body": schema_to_type_tree(&pet_schema())}),
        )
        .with_request(
            "warehouse_lookup_200",
            json!({"parameters": {"sku": "integer"}}),
        )
        .with_response(
            "inventory_fetchAnimal_200",
            json!({"body": schema_to_type_tree(&animal_schema())}),
        )
}
