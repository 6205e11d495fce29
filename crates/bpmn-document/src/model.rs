//! Static type hierarchy of the process model.
//!
//! Types outside the table (extension types such as `zeebe:IoMapping`) have
//! no supertype and only match themselves.

/// Direct supertype of a model type, if known.
pub fn super_type(node_type: &str) -> Option<&'static str> {
    let parent = match node_type {
        "bpmn:BaseElement" => return None,
        "bpmn:Definitions" | "bpmn:RootElement" | "bpmn:FlowElement" | "bpmn:Artifact"
        | "bpmn:Documentation" | "bpmn:CategoryValue" => "bpmn:BaseElement",

        "bpmn:CallableElement" | "bpmn:Message" | "bpmn:EventDefinition" | "bpmn:Category"
        | "bpmn:Signal" | "bpmn:Error" | "bpmn:Escalation" => "bpmn:RootElement",
        "bpmn:Process" => "bpmn:CallableElement",

        "bpmn:FlowNode" | "bpmn:SequenceFlow" => "bpmn:FlowElement",
        "bpmn:Activity" | "bpmn:Event" | "bpmn:Gateway" => "bpmn:FlowNode",

        "bpmn:Task" | "bpmn:SubProcess" | "bpmn:CallActivity" => "bpmn:Activity",
        "bpmn:ServiceTask" | "bpmn:UserTask" | "bpmn:ScriptTask" | "bpmn:SendTask"
        | "bpmn:ReceiveTask" | "bpmn:BusinessRuleTask" | "bpmn:ManualTask" => "bpmn:Task",
        "bpmn:AdHocSubProcess" | "bpmn:Transaction" => "bpmn:SubProcess",

        "bpmn:CatchEvent" | "bpmn:ThrowEvent" => "bpmn:Event",
        "bpmn:StartEvent" | "bpmn:IntermediateCatchEvent" | "bpmn:BoundaryEvent" => {
            "bpmn:CatchEvent"
        }
        "bpmn:EndEvent" | "bpmn:IntermediateThrowEvent" => "bpmn:ThrowEvent",

        "bpmn:ExclusiveGateway" | "bpmn:ParallelGateway" | "bpmn:InclusiveGateway"
        | "bpmn:EventBasedGateway" | "bpmn:ComplexGateway" => "bpmn:Gateway",

        "bpmn:Group" | "bpmn:TextAnnotation" | "bpmn:Association" => "bpmn:Artifact",

        "bpmn:MessageEventDefinition"
        | "bpmn:TimerEventDefinition"
        | "bpmn:ConditionalEventDefinition"
        | "bpmn:SignalEventDefinition"
        | "bpmn:ErrorEventDefinition"
        | "bpmn:EscalationEventDefinition"
        | "bpmn:TerminateEventDefinition"
        | "bpmn:LinkEventDefinition"
        | "bpmn:CompensateEventDefinition" => "bpmn:EventDefinition",

        _ => return None,
    };
    Some(parent)
}

/// Whether `node_type` is `target` or one of its subtypes.
pub fn is_a(node_type: &str, target: &str) -> bool {
    let mut current = Some(node_type);
    while let Some(ty) = current {
        if ty == target {
            return true;
        }
        current = super_type(ty);
    }
    false
}

/// Local part of a qualified type name (`bpmn:ServiceTask` -> `ServiceTask`).
pub fn local_name(node_type: &str) -> &str {
    node_type
        .split_once(':')
        .map(|(_, local)| local)
        .unwrap_or(node_type)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_a_walks_hierarchy() {
        assert!(is_a("bpmn:ServiceTask", "bpmn:ServiceTask"));
        assert!(is_a("bpmn:ServiceTask", "bpmn:Task"));
        assert!(is_a("bpmn:ServiceTask", "bpmn:FlowNode"));
        assert!(is_a("bpmn:ServiceTask", "bpmn:BaseElement"));
        assert!(!is_a("bpmn:ServiceTask", "bpmn:Event"));

        assert!(is_a("bpmn:IntermediateCatchEvent", "bpmn:CatchEvent"));
        assert!(is_a("bpmn:MessageEventDefinition", "bpmn:EventDefinition"));
        assert!(is_a("bpmn:Process", "bpmn:RootElement"));
    }

    #[test]
    fn test_extension_types_match_only_themselves() {
        assert!(is_a("zeebe:IoMapping", "zeebe:IoMapping"));
        assert!(!is_a("zeebe:IoMapping", "bpmn:BaseElement"));
    }

    #[test]
    fn test_local_name() {
        assert_eq!(local_name("bpmn:ServiceTask"), "ServiceTask");
        assert_eq!(local_name("Plain"), "Plain");
    }
}
