//! Shared test documents and template catalogs

use bpmn_document::Document;
use serde_json::json;

use crate::template::ElementTemplate;

/// A process exercising every element kind the engine distinguishes
pub fn diagram() -> Document {
    Document::from_json(&json!({
        "$type": "bpmn:Definitions",
        "id": "Definitions_1",
        "rootElements": [
            { "$type": "bpmn:Message", "id": "Message_1", "name": "single" },
            { "$type": "bpmn:Message", "id": "Message_2", "name": "shared" },
            {
                "$type": "bpmn:Process",
                "id": "Process_1",
                "flowElements": [
                    { "$type": "bpmn:Task", "id": "Task_1", "zeebe:modelerTemplate": "foo" },
                    {
                        "$type": "bpmn:Task",
                        "id": "Task_2",
                        "zeebe:modelerTemplate": "foo",
                        "zeebe:modelerTemplateVersion": 1,
                        "zeebe:modelerTemplateIcon": "data:image/svg+xml,foo"
                    },
                    {
                        "$type": "bpmn:Task",
                        "id": "Task_3",
                        "name": "Task 3",
                        "documentation": [{ "$type": "bpmn:Documentation", "text": "Keep me" }],
                        "outgoing": [{ "$ref": "SequenceFlow_1" }]
                    },
                    {
                        "$type": "bpmn:ServiceTask",
                        "id": "ServiceTask",
                        "zeebe:modelerTemplate": "default",
                        "zeebe:modelerTemplateVersion": 1,
                        "incoming": [{ "$ref": "SequenceFlow_1" }],
                        "extensionElements": {
                            "$type": "bpmn:ExtensionElements",
                            "values": [{ "$type": "zeebe:TaskDefinition", "type": "default-worker" }]
                        }
                    },
                    {
                        "$type": "bpmn:ServiceTask",
                        "id": "UnknownTemplateTask",
                        "name": "Unknown",
                        "zeebe:modelerTemplate": "not-in-catalog",
                        "extensionElements": {
                            "$type": "bpmn:ExtensionElements",
                            "values": [
                                { "$type": "zeebe:TaskDefinition", "type": "worker" },
                                {
                                    "$type": "zeebe:TaskHeaders",
                                    "values": [{ "$type": "zeebe:Header", "key": "k", "value": "v" }]
                                }
                            ]
                        }
                    },
                    { "$type": "bpmn:StartEvent", "id": "StartEvent_1" },
                    { "$type": "bpmn:IntermediateThrowEvent", "id": "IntermediateThrowEvent_1" },
                    {
                        "$type": "bpmn:IntermediateCatchEvent",
                        "id": "MessageEvent_1",
                        "eventDefinitions": [{
                            "$type": "bpmn:MessageEventDefinition",
                            "id": "MessageEventDefinition_1",
                            "messageRef": { "$ref": "Message_1" }
                        }]
                    },
                    {
                        "$type": "bpmn:IntermediateCatchEvent",
                        "id": "TimerEvent_1",
                        "eventDefinitions": [{
                            "$type": "bpmn:TimerEventDefinition",
                            "id": "TimerEventDefinition_1"
                        }]
                    },
                    { "$type": "bpmn:ReceiveTask", "id": "ReceiveTask_1", "messageRef": { "$ref": "Message_2" } },
                    { "$type": "bpmn:ReceiveTask", "id": "ReceiveTask_2", "messageRef": { "$ref": "Message_2" } },
                    {
                        "$type": "bpmn:SubProcess",
                        "id": "SubProcess_1",
                        "flowElements": [
                            { "$type": "bpmn:Task", "id": "SubTask_1" },
                            { "$type": "bpmn:EndEvent", "id": "SubEnd_1" }
                        ]
                    },
                    { "$type": "bpmn:CallActivity", "id": "CallActivity_1" },
                    {
                        "$type": "bpmn:SequenceFlow",
                        "id": "SequenceFlow_1",
                        "sourceRef": { "$ref": "Task_3" },
                        "targetRef": { "$ref": "ServiceTask" }
                    }
                ],
                "artifacts": [
                    { "$type": "bpmn:Group", "id": "Group_1" },
                    { "$type": "bpmn:TextAnnotation", "id": "TextAnnotation_1", "text": "Note" }
                ]
            }
        ]
    }))
    .unwrap()
}

/// Catalog used for registry lookups: families with versioned, unversioned
/// and deprecated members
pub fn simple_templates() -> Vec<ElementTemplate> {
    let mut templates = Vec::new();
    for version in [None, Some(1), Some(2), Some(3)] {
        let mut template = json!({
            "name": "Foo",
            "id": "foo",
            "appliesTo": ["bpmn:Task"],
            "properties": []
        });
        if let Some(version) = version {
            template["version"] = json!(version);
        }
        templates.push(template);
    }
    templates.extend([
        json!({ "name": "Bar", "id": "bar", "version": 1, "appliesTo": ["bpmn:Task"], "properties": [] }),
        json!({ "name": "Bar", "id": "bar", "version": 2, "appliesTo": ["bpmn:Task"], "properties": [] }),
        json!({ "name": "Baz", "id": "baz", "appliesTo": ["bpmn:Task"], "properties": [] }),
        json!({
            "name": "Deprecated",
            "id": "deprecated",
            "version": 1,
            "deprecated": { "message": "Use foo instead", "documentationRef": "https://example.com/foo" },
            "appliesTo": ["bpmn:Task"],
            "properties": []
        }),
        json!({
            "name": "Default",
            "id": "default",
            "version": 1,
            "appliesTo": ["bpmn:ServiceTask"],
            "properties": [{
                "type": "Hidden",
                "value": "default-worker",
                "binding": { "type": "zeebe:taskDefinition:type" }
            }]
        }),
        json!({
            "name": "Process",
            "id": "process-template",
            "appliesTo": ["bpmn:Process"],
            "properties": [
                { "label": "Version tag", "binding": { "type": "zeebe:property", "name": "versionTag" } }
            ]
        }),
    ]);
    templates
        .into_iter()
        .map(|t| ElementTemplate::from_value(t).unwrap())
        .collect()
}

/// Templates driving the application scenarios
pub fn templates() -> Vec<ElementTemplate> {
    let catalog = json!([
        {
            "name": "REST",
            "id": "rest",
            "appliesTo": ["bpmn:Task"],
            "elementType": { "value": "bpmn:ServiceTask" },
            "icon": { "contents": "data:image/svg+xml,rest" },
            "properties": [
                { "type": "Hidden", "value": "REST Task", "binding": { "type": "property", "name": "name" } },
                { "type": "Hidden", "value": "http", "binding": { "type": "zeebe:taskDefinition:type" } },
                {
                    "label": "Retries",
                    "value": "5",
                    "binding": { "type": "zeebe:taskDefinition", "property": "retries" }
                },
                { "label": "URL", "value": "=baseUrl", "binding": { "type": "zeebe:input", "name": "url" } },
                {
                    "label": "Method",
                    "type": "Dropdown",
                    "value": "GET",
                    "choices": [{ "name": "GET", "value": "GET" }, { "name": "POST", "value": "POST" }],
                    "binding": { "type": "zeebe:input", "name": "method" }
                },
                { "label": "Result", "value": "response", "binding": { "type": "zeebe:output", "source": "=body" } }
            ]
        },
        {
            "name": "Plain",
            "id": "plain",
            "appliesTo": ["bpmn:Task"],
            "properties": [
                { "label": "Name", "binding": { "type": "property", "name": "name" } }
            ]
        },
        {
            "name": "Template A",
            "id": "template-a",
            "version": 1,
            "appliesTo": ["bpmn:Task"],
            "properties": [
                { "label": "Default", "value": "A1", "binding": { "type": "zeebe:input", "name": "defaultValue" } },
                {
                    "id": "changedDefaultValue",
                    "label": "Changed",
                    "value": "A1",
                    "binding": { "type": "zeebe:input", "name": "changedDefaultValue" }
                },
                { "label": "Only in A1", "value": "gone", "binding": { "type": "zeebe:taskHeader", "key": "legacy" } }
            ]
        },
        {
            "name": "Template A",
            "id": "template-a",
            "version": 2,
            "appliesTo": ["bpmn:Task"],
            "properties": [
                { "label": "Default", "value": "A2", "binding": { "type": "zeebe:input", "name": "defaultValue" } },
                {
                    "id": "changedDefaultValue",
                    "label": "Changed",
                    "value": "A2",
                    "binding": { "type": "zeebe:input", "name": "changedDefaultValue" }
                }
            ]
        },
        {
            "name": "Template B",
            "id": "template-b",
            "appliesTo": ["bpmn:Task"],
            "properties": [
                {
                    "label": "Changed",
                    "type": "Dropdown",
                    "value": "B1",
                    "choices": [{ "name": "B1", "value": "B1" }, { "name": "B2", "value": "B2" }],
                    "binding": { "type": "zeebe:input", "name": "changedDefaultValue" }
                }
            ]
        },
        {
            "name": "Conditional",
            "id": "condition-name",
            "appliesTo": ["bpmn:Task"],
            "elementType": { "value": "bpmn:ServiceTask" },
            "properties": [
                { "id": "name", "label": "Name", "binding": { "type": "property", "name": "name" } },
                {
                    "label": "Input",
                    "value": "=a",
                    "condition": { "property": "name", "equals": "foo" },
                    "binding": { "type": "zeebe:input", "name": "a" }
                },
                {
                    "label": "Output",
                    "value": "b",
                    "condition": { "property": "name", "equals": "foo" },
                    "binding": { "type": "zeebe:output", "source": "=b" }
                },
                {
                    "label": "Property",
                    "value": "c",
                    "condition": { "property": "name", "equals": "foo" },
                    "binding": { "type": "zeebe:property", "name": "c" }
                },
                {
                    "label": "Header",
                    "value": "d",
                    "condition": { "property": "name", "equals": "foo" },
                    "binding": { "type": "zeebe:taskHeader", "key": "d" }
                },
                {
                    "label": "Type",
                    "value": "worker",
                    "condition": { "property": "name", "equals": "foo" },
                    "binding": { "type": "zeebe:taskDefinition", "property": "type" }
                },
                {
                    "label": "Retries",
                    "value": "3",
                    "condition": { "property": "name", "equals": "foo" },
                    "binding": { "type": "zeebe:taskDefinition", "property": "retries" }
                }
            ]
        },
        {
            "name": "Chain",
            "id": "condition-chain",
            "appliesTo": ["bpmn:Task"],
            "elementType": { "value": "bpmn:ServiceTask" },
            "properties": [
                { "id": "mode", "type": "Hidden", "value": "advanced", "binding": { "type": "zeebe:input", "name": "mode" } },
                {
                    "id": "advanced",
                    "value": "yes",
                    "condition": { "property": "mode", "equals": "advanced" },
                    "binding": { "type": "zeebe:input", "name": "advanced" }
                },
                {
                    "id": "detail",
                    "value": "full",
                    "condition": { "property": "advanced", "equals": "yes" },
                    "binding": { "type": "zeebe:input", "name": "detail" }
                }
            ]
        },
        {
            "name": "Message catch",
            "id": "message-catch",
            "appliesTo": ["bpmn:IntermediateThrowEvent", "bpmn:IntermediateCatchEvent"],
            "elementType": {
                "value": "bpmn:IntermediateCatchEvent",
                "eventDefinition": "bpmn:MessageEventDefinition"
            },
            "properties": [
                { "type": "Hidden", "value": "Catch", "binding": { "type": "property", "name": "name" } },
                { "type": "Hidden", "value": "hiddenName", "binding": { "type": "bpmn:Message#property", "name": "name" } },
                {
                    "label": "Correlation key",
                    "value": "=key",
                    "binding": { "type": "bpmn:Message#zeebe:subscription#property", "name": "correlationKey" }
                }
            ]
        },
        {
            "name": "Message receive",
            "id": "message-receive",
            "appliesTo": ["bpmn:ReceiveTask"],
            "properties": [
                {
                    "label": "Correlation key",
                    "value": "=orderId",
                    "binding": { "type": "message:zeebeSubscription:property", "name": "correlationKey" }
                },
                { "type": "Hidden", "value": "order", "binding": { "type": "zeebe:property", "name": "kind" } }
            ]
        },
        {
            "name": "Annotated",
            "id": "annotation",
            "appliesTo": ["bpmn:TextAnnotation", "bpmn:Group"],
            "properties": [
                { "type": "Hidden", "value": "Annotated", "binding": { "type": "property", "name": "text" } },
                { "type": "Hidden", "value": "note", "binding": { "type": "zeebe:property", "name": "kind" } }
            ]
        },
        {
            "name": "Process",
            "id": "process",
            "appliesTo": ["bpmn:Process", "bpmn:SubProcess"],
            "properties": [
                { "type": "Hidden", "value": "Templated", "binding": { "type": "property", "name": "name" } },
                { "label": "Version tag", "value": "v1", "binding": { "type": "zeebe:property", "name": "versionTag" } }
            ]
        },
        {
            "name": "Call",
            "id": "call",
            "appliesTo": ["bpmn:CallActivity"],
            "properties": [
                { "type": "Hidden", "value": "child", "binding": { "type": "zeebe:calledElement", "property": "processId" } }
            ]
        },
        {
            "name": "Grouped",
            "id": "grouped",
            "appliesTo": ["bpmn:Task"],
            "groups": [
                { "id": "connection", "label": "Connection", "openByDefault": true },
                { "id": "empty", "label": "Nothing here" }
            ],
            "properties": [
                { "label": "Name", "binding": { "type": "property", "name": "name" } },
                { "type": "Hidden", "value": "grouped", "binding": { "type": "zeebe:taskDefinition:type" } },
                {
                    "id": "url",
                    "label": "URL",
                    "group": "connection",
                    "feel": "required",
                    "constraints": { "notEmpty": true },
                    "binding": { "type": "zeebe:input", "name": "url" }
                },
                {
                    "label": "Secure",
                    "type": "Boolean",
                    "value": true,
                    "group": "connection",
                    "binding": { "type": "zeebe:input", "name": "secure" }
                },
                {
                    "label": "Timeout",
                    "type": "Number",
                    "value": 30,
                    "group": "unknown-group",
                    "binding": { "type": "zeebe:input", "name": "timeout" }
                },
                {
                    "label": "Body",
                    "type": "Text",
                    "editable": false,
                    "value": "{}",
                    "group": "connection",
                    "condition": { "property": "url", "oneOf": ["https://a", "https://b"] },
                    "binding": { "type": "zeebe:input", "name": "body" }
                }
            ]
        }
    ]);
    serde_json::from_value(catalog).unwrap()
}

/// A template of [`templates`] by id and version
pub fn template(id: &str, version: Option<u32>) -> ElementTemplate {
    templates()
        .into_iter()
        .find(|t| t.id == id && t.version == version)
        .unwrap_or_else(|| panic!("no fixture template {id} ({version:?})"))
}
