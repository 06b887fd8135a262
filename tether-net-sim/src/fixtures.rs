//! Descriptor builders for test trees

use std::collections::{BTreeMap, BTreeSet};
use tether_model::{tags, FunctionSignature, NodeDescriptor};

fn tag_set(tags: &[&str]) -> BTreeSet<String> {
    tags.iter().map(|t| t.to_string()).collect()
}

/// A variable node: `value` property plus `get`/`set` functions.
pub fn variable(name: &str, path: &str) -> NodeDescriptor {
    let mut functions = BTreeMap::new();
    functions.insert("get".to_string(), FunctionSignature::default());
    functions.insert(
        "set".to_string(),
        FunctionSignature {
            args: vec!["value".to_string()],
            kwargs: Vec::new(),
        },
    );
    NodeDescriptor {
        name: name.to_string(),
        description: String::new(),
        display_group: None,
        path: path.to_string(),
        class_tag: "UIntVariable".to_string(),
        base_tags: tag_set(&[tags::VARIABLE]),
        children: BTreeMap::new(),
        functions,
        properties: ["value".to_string()].into_iter().collect(),
    }
}

/// A command node, directly invocable.
pub fn command(name: &str, path: &str) -> NodeDescriptor {
    NodeDescriptor {
        name: name.to_string(),
        description: String::new(),
        display_group: None,
        path: path.to_string(),
        class_tag: "Command".to_string(),
        base_tags: tag_set(&[tags::COMMAND]),
        children: BTreeMap::new(),
        functions: BTreeMap::new(),
        properties: BTreeSet::new(),
    }
}

/// A device container holding `children`.
pub fn device(name: &str, path: &str, children: Vec<NodeDescriptor>) -> NodeDescriptor {
    NodeDescriptor {
        name: name.to_string(),
        description: String::new(),
        display_group: None,
        path: path.to_string(),
        class_tag: "Device".to_string(),
        base_tags: tag_set(&[tags::DEVICE]),
        children: children
            .into_iter()
            .map(|c| (c.name.clone(), Some(c)))
            .collect(),
        functions: BTreeMap::new(),
        properties: BTreeSet::new(),
    }
}

/// The tree root; its path is its own name.
pub fn root_device(name: &str, children: Vec<NodeDescriptor>) -> NodeDescriptor {
    let mut desc = device(name, name, children);
    desc.class_tag = "Root".to_string();
    desc.base_tags = tag_set(&[tags::ROOT, tags::DEVICE]);
    desc
}
