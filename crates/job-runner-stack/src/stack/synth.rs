//! Template synthesis
//!
//! Renders a stack as a CloudFormation-shaped JSON document. Image lookups
//! are recorded under `Metadata.ImageLookups` so a reconciler can see which
//! query produced each concrete AMI.

use super::Stack;
use super::types::Declaration;
use crate::aws::iam::ProfileRole;
use serde_json::{Map, Value, json};

impl Stack {
    /// Render the stack's desired state
    pub fn synthesize(&self) -> Value {
        let mut resources = Map::new();
        for declaration in &self.declarations {
            resources.insert(
                declaration.id().logical_id().to_string(),
                resource_json(declaration),
            );
        }

        let mut lookups: Vec<(String, String)> = self
            .image_lookups()
            .map(|(query, image)| (query.cache_key(), image.to_string()))
            .collect();
        lookups.sort();
        let lookups: Map<String, Value> = lookups
            .into_iter()
            .map(|(key, image)| (key, Value::String(image)))
            .collect();

        json!({
            "AWSTemplateFormatVersion": "2010-09-09",
            "Description": format!("GitLab job runners ({})", self.name()),
            "Metadata": {
                "StackId": self.id().as_str(),
                "Region": self.region(),
                "ImageLookups": lookups,
            },
            "Resources": resources,
        })
    }
}

fn tags_json(tags: &[(String, String)]) -> Value {
    Value::Array(
        tags.iter()
            .map(|(key, value)| json!({ "Key": key, "Value": value }))
            .collect(),
    )
}

fn resource_json(declaration: &Declaration) -> Value {
    let properties = match declaration {
        Declaration::Role(role) => json!({
            "RoleName": role.role_name,
            "AssumeRolePolicyDocument": role.assume_role_policy,
            "ManagedPolicyArns": role.managed_policy_arns,
            "Tags": tags_json(&role.tags),
        }),
        Declaration::InstanceProfile(profile) => {
            let role = match &profile.role {
                ProfileRole::Declared { id, .. } => json!({ "Ref": id.logical_id() }),
                ProfileRole::Existing(reference) => json!(reference.role_name()),
            };
            json!({
                "InstanceProfileName": profile.profile_name,
                "Roles": [role],
                "Tags": tags_json(&profile.tags),
            })
        }
    };

    json!({
        "Type": declaration.kind().cfn_type(),
        "Properties": properties,
    })
}

#[cfg(test)]
mod tests {
    use crate::aws::ec2::EmptyCatalog;
    use crate::stack::Stack;
    use std::sync::Arc;

    #[test]
    fn test_empty_stack_template() {
        let stack = Stack::new("ci", "eu-central-1", Arc::new(EmptyCatalog)).unwrap();
        let template = stack.synthesize();
        assert_eq!(template["AWSTemplateFormatVersion"], "2010-09-09");
        assert_eq!(template["Metadata"]["Region"], "eu-central-1");
        assert!(template["Resources"].as_object().unwrap().is_empty());
        assert!(template["Metadata"]["ImageLookups"].as_object().unwrap().is_empty());
    }
}
