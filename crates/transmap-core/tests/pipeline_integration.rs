//! End-to-end tests of the mapping workflow
//!
//! schema -> path tree -> suggested pairs -> compile -> validate -> persist
//! -> commit to the attribute graph -> suggestions for the next mapping

mod test_support;

use pretty_assertions::assert_eq;
use serde_json::json;
use tempfile::TempDir;
use test_support::{chain, schemas};
use transmap_core::{
    attribute_suggestions, build_openapi_mapping, commit_pairs, ensure_all_mapped,
    execute_mapping, leaf_key_chains, merge_pairs, same_name_pairs, to_tree, AttributeGraph,
    CreationType, DefaultEngine, JsonFileAttributeStore, JsonFileMappingStore, MappingPair,
    MappingStore, MappingType, MergeKey, PathTreeNode, SchemaProvider, ValidationEngine, ValidationFailure,
};

const SOURCE: &str = "petstore_getPet_200";
const TARGET: &str = "inventory_fetchAnimal_200";

fn tree_of(root: &str, value: Option<serde_json::Value>) -> Vec<PathTreeNode> {
    let value = value.expect("schema registered");
    to_tree(&json!({ root: value }), &[])
}

#[tokio::test]
async fn test_full_openapi_mapping_workflow() {
    let dir = TempDir::new().unwrap();
    let schemas = schemas();

    // response: the source response is built from the target response
    let required_response = tree_of(SOURCE, schemas.response_schema(SOURCE).await.unwrap());
    let provided_response = tree_of(TARGET, schemas.response_schema(TARGET).await.unwrap());

    let mut response_pairs = Vec::new();
    let added = merge_pairs(
        &mut response_pairs,
        same_name_pairs(&required_response, &provided_response),
        MergeKey::Required,
    );
    assert_eq!(added, 2);

    // every required leaf without a suggestion starts unmapped
    let unmapped: Vec<MappingPair> = leaf_key_chains(&required_response)
        .into_iter()
        .map(|required| MappingPair::manual(vec![], required))
        .collect();
    merge_pairs(&mut response_pairs, unmapped, MergeKey::Required);
    let failure = ensure_all_mapped(&response_pairs).unwrap_err();
    let mut missing = failure.missing();
    missing.sort();
    assert_eq!(
        missing,
        vec![
            chain("petstore_getPet_200.body.tags"),
            chain("petstore_getPet_200.body.weight"),
        ]
    );

    for pair in response_pairs.iter_mut() {
        if pair.required == chain("petstore_getPet_200.body.weight") {
            pair.provided = vec![chain("inventory_fetchAnimal_200.body.weightGrams")];
            pair.mapping_code = "inventory_fetchAnimal_200.body.weightGrams / 1000".to_string();
        } else if pair.required == chain("petstore_getPet_200.body.tags") {
            pair.provided = vec![chain("inventory_fetchAnimal_200.body.id")];
            pair.mapping_code = "$string(inventory_fetchAnimal_200.body.id)".to_string();
        }
    }
    ensure_all_mapped(&response_pairs).unwrap();

    let request_pairs = vec![MappingPair::manual(
        vec![chain("petstore_getPet_200.parameters.petId")],
        chain("inventory_fetchAnimal_200.parameters.animalId"),
    )];

    let mapping = build_openapi_mapping(
        SOURCE,
        &[TARGET.to_string()],
        &request_pairs,
        &response_pairs,
        MappingType::Transformation,
        Some("tester".to_string()),
    )
    .unwrap();

    let validation = ValidationEngine::new(schemas.clone());
    validation.validate(&mapping).await.unwrap().unwrap();

    // persist the mapping and teach the graph
    let mappings = JsonFileMappingStore::open(dir.path().join("mappings.json"))
        .await
        .unwrap();
    let id = mappings.create(mapping.clone()).await.unwrap();

    let graph = AttributeGraph::new(
        JsonFileAttributeStore::open(dir.path().join("graph.json"))
            .await
            .unwrap(),
    );
    let all_pairs: Vec<MappingPair> = request_pairs.iter().chain(&response_pairs).cloned().collect();
    assert_eq!(commit_pairs(&graph, &all_pairs).await.unwrap(), 4);

    // both stores survive a reopen
    let reopened = JsonFileMappingStore::open(dir.path().join("mappings.json"))
        .await
        .unwrap();
    assert_eq!(reopened.get(&id).await.unwrap().unwrap().source_id, SOURCE);

    let graph = AttributeGraph::new(
        JsonFileAttributeStore::open(dir.path().join("graph.json"))
            .await
            .unwrap(),
    );
    let suggestions = attribute_suggestions(
        &[chain("inventory_fetchAnimal_200.body.weightGrams")],
        &[chain("petstore_getPet_200.body.weight")],
        &[],
        &graph,
    )
    .await
    .unwrap();
    assert_eq!(suggestions.len(), 1);
    assert_eq!(suggestions[0].creation_type, CreationType::Attribute);
    assert_eq!(
        suggestions[0].mapping_code,
        "(petstore_getPet_200.body.weight * 1000)"
    );

    // executing the response mapping rebuilds the source response
    let (_, response_tree) = mapping.openapi_trees().unwrap();
    let output = execute_mapping(
        response_tree,
        &json!({TARGET: {"body": {"id": 7, "name": "Rex", "weightGrams": 12500}}}),
        &DefaultEngine::new(),
    )
    .unwrap();
    assert_eq!(
        output,
        json!({SOURCE: {"body": {"id": 7, "name": "Rex", "weight": 12.5, "tags": "7"}}})
    );
}

#[tokio::test]
async fn test_incomplete_mapping_reports_missing_leaves() {
    let mapping = build_openapi_mapping(
        SOURCE,
        &[TARGET.to_string()],
        &[],
        &[MappingPair::manual(
            vec![chain("inventory_fetchAnimal_200.body.id")],
            chain("petstore_getPet_200.body.id"),
        )],
        MappingType::Manual,
        None,
    )
    .unwrap();

    let failure = ValidationEngine::new(schemas())
        .validate_openapi(&mapping)
        .await
        .unwrap()
        .unwrap_err();
    match failure {
        ValidationFailure::OpenApi {
            missing_request,
            missing_response,
        } => {
            assert_eq!(
                missing_request,
                vec![chain("inventory_fetchAnimal_200.parameters.animalId")]
            );
            assert_eq!(missing_response.len(), 3);
        }
        other => panic!("unexpected failure: {other}"),
    }
}
