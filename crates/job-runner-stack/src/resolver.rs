//! Job runner resolution
//!
//! [`resolve`] turns a partial [`RunnerConfiguration`] into a
//! [`ResolvedJobRunner`]. The steps run in a fixed order and each one only
//! sees what the previous steps produced:
//!
//! 1. credential check, field validation and reference parsing ([`Plan`])
//! 2. identity: reuse the supplied role or declare one
//! 3. binding: declare an instance profile for the *resolved* role
//! 4. image: the supplied AMI, or a memoized catalog lookup
//! 5. tags on everything this resolution declared
//! 6. commit
//!
//! Steps 2-5 stage into a [`PendingDeclarations`] batch, so any error leaves
//! the stack exactly as it was.

use crate::aws::ec2::{ImageId, ImageQuery, InstanceType};
use crate::aws::iam::{
    self, InstanceProfileDeclaration, ProfileRole, RoleDeclaration, RoleRecipe, RoleReference,
};
use crate::config::{AuthToken, ConfigBlock, RunnerConfiguration};
use crate::error::{ResolveError, ResolveResult};
use crate::policy::DefaultPolicy;
use crate::stack::{Declaration, DeclarationId, PendingDeclarations, Stack, StackId};
use crate::supply::Supply;
use job_runner_common::{ResourceKind, tags};
use std::num::NonZeroU32;
use std::sync::Arc;
use tracing::{debug, info};

/// Identity a resolved runner's executors run as
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedIdentity {
    /// Caller-supplied role, the same `Arc` the configuration carried
    Provided(Arc<RoleReference>),
    /// Role declared for this runner
    Declared(RoleDeclaration),
}

impl ResolvedIdentity {
    pub fn role_name(&self) -> &str {
        match self {
            ResolvedIdentity::Provided(reference) => reference.role_name(),
            ResolvedIdentity::Declared(role) => &role.role_name,
        }
    }

    pub fn is_provided(&self) -> bool {
        matches!(self, ResolvedIdentity::Provided(_))
    }

    /// Declaration id, when the role was declared by this runner
    pub fn declaration_id(&self) -> Option<&DeclarationId> {
        match self {
            ResolvedIdentity::Provided(_) => None,
            ResolvedIdentity::Declared(role) => Some(&role.id),
        }
    }
}

/// Fully resolved job runner. Immutable once built.
#[derive(Debug, Clone)]
pub struct ResolvedJobRunner {
    stack: StackId,
    region: String,
    label: String,
    auth_token: AuthToken,
    service_url: String,
    compute_shape: InstanceType,
    concurrency_limit: Option<NonZeroU32>,
    log_byte_limit: Option<u64>,
    environment_overrides: Vec<String>,
    container_runtime_config: ConfigBlock,
    machine_provisioner_config: ConfigBlock,
    autoscaling_rules: Vec<ConfigBlock>,
    image: ImageId,
    image_source: Supply<(), ImageQuery>,
    identity: ResolvedIdentity,
    identity_profile: InstanceProfileDeclaration,
}

impl ResolvedJobRunner {
    /// Stack this runner was declared into
    pub fn stack(&self) -> &StackId {
        &self.stack
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn auth_token(&self) -> &AuthToken {
        &self.auth_token
    }

    pub fn service_url(&self) -> &str {
        &self.service_url
    }

    pub fn compute_shape(&self) -> &InstanceType {
        &self.compute_shape
    }

    /// `None` means unbounded
    pub fn concurrency_limit(&self) -> Option<NonZeroU32> {
        self.concurrency_limit
    }

    /// Passed through unchanged; the unit is whatever the runner agent expects
    pub fn log_byte_limit(&self) -> Option<u64> {
        self.log_byte_limit
    }

    pub fn environment_overrides(&self) -> &[String] {
        &self.environment_overrides
    }

    pub fn container_runtime_config(&self) -> &ConfigBlock {
        &self.container_runtime_config
    }

    pub fn machine_provisioner_config(&self) -> &ConfigBlock {
        &self.machine_provisioner_config
    }

    pub fn autoscaling_rules(&self) -> &[ConfigBlock] {
        &self.autoscaling_rules
    }

    pub fn resolved_image_reference(&self) -> &ImageId {
        &self.image
    }

    /// `Provided(())` for explicit images, otherwise the query that was used
    pub fn resolved_image_source(&self) -> &Supply<(), ImageQuery> {
        &self.image_source
    }

    pub fn resolved_identity(&self) -> &ResolvedIdentity {
        &self.identity
    }

    pub fn resolved_identity_profile(&self) -> &InstanceProfileDeclaration {
        &self.identity_profile
    }

    /// docker-machine `amazonec2` driver options for this runner
    pub fn machine_options(&self) -> Vec<String> {
        vec![
            format!("amazonec2-region={}", self.region),
            format!("amazonec2-instance-type={}", self.compute_shape),
            format!("amazonec2-ami={}", self.image),
            format!(
                "amazonec2-iam-instance-profile={}",
                self.identity_profile.profile_name
            ),
        ]
    }
}

/// Validated, default-filled inputs. Nothing has been declared yet.
struct Plan {
    label: String,
    auth_token: AuthToken,
    service_url: String,
    compute_shape: InstanceType,
    concurrency_limit: Option<NonZeroU32>,
    log_byte_limit: Option<u64>,
    environment_overrides: Vec<String>,
    container_runtime_config: ConfigBlock,
    machine_provisioner_config: ConfigBlock,
    autoscaling_rules: Vec<ConfigBlock>,
    identity: Supply<Arc<RoleReference>, RoleRecipe>,
    image: Supply<ImageId, ImageQuery>,
}

impl Plan {
    fn new(policy: &DefaultPolicy, config: RunnerConfiguration) -> ResolveResult<Self> {
        let auth_token = match config.auth_token.clone() {
            Some(token) if !token.is_empty() => token,
            _ => return Err(ResolveError::MissingCredential),
        };
        garde::Validate::validate(&config)?;

        let identity = Supply::from_option(config.identity, || policy.role_recipe())
            .try_map_provided(|role| match role.validate() {
                Ok(()) => Ok(role),
                Err(reason) => Err(ResolveError::invalid_reference(
                    "identity",
                    role.as_str(),
                    reason,
                )),
            })?;

        let image = Supply::from_option(config.image, || policy.image_query.clone())
            .try_map_provided(|image| {
                ImageId::parse(&image)
                    .map_err(|reason| ResolveError::invalid_reference("image", image.as_str(), reason))
            })?;

        let (shape_field, shape) = match config.compute_shape {
            Some(shape) => ("compute_shape", shape),
            None => ("default instance type", policy.instance_type.clone()),
        };
        let compute_shape = InstanceType::parse(&shape)
            .map_err(|reason| ResolveError::invalid_reference(shape_field, shape.as_str(), reason))?;

        Ok(Self {
            label: config.name.unwrap_or_else(|| policy.label.clone()),
            auth_token,
            service_url: config
                .service_url
                .unwrap_or_else(|| policy.service_url.clone()),
            compute_shape,
            concurrency_limit: config.concurrency_limit.and_then(NonZeroU32::new),
            log_byte_limit: config.log_byte_limit,
            environment_overrides: config.environment_overrides,
            container_runtime_config: config.container_runtime_config,
            machine_provisioner_config: config.machine_provisioner_config,
            autoscaling_rules: config.autoscaling_rules,
            identity,
            image,
        })
    }
}

/// Outcome of identity resolution, before tags and commit
enum IdentityResolution {
    Provided(Arc<RoleReference>),
    Declared { id: DeclarationId, role_name: String },
}

fn resolve_identity(
    pending: &mut PendingDeclarations<'_>,
    label: &str,
    identity: Supply<Arc<RoleReference>, RoleRecipe>,
) -> IdentityResolution {
    match identity {
        Supply::Provided(role) => {
            debug!(role = %role, "Using provided role");
            IdentityResolution::Provided(role)
        }
        Supply::ToSynthesize(recipe) => {
            let id = pending.allocate_id(&format!("{}RunnersRole", iam::logical_id_prefix(label)));
            let role_name =
                pending.allocate_name(ResourceKind::IamRole, &iam::derive_role_name(label));
            pending.declare(Declaration::Role(RoleDeclaration::new(
                id.clone(),
                role_name.clone(),
                &recipe,
            )));
            IdentityResolution::Declared { id, role_name }
        }
    }
}

fn bind_identity(
    pending: &mut PendingDeclarations<'_>,
    label: &str,
    identity: &IdentityResolution,
) -> DeclarationId {
    let role = match identity {
        IdentityResolution::Provided(reference) => ProfileRole::Existing(Arc::clone(reference)),
        IdentityResolution::Declared { id, role_name } => ProfileRole::Declared {
            id: id.clone(),
            role_name: role_name.clone(),
        },
    };
    let id = pending.allocate_id(&format!(
        "{}RunnersInstanceProfile",
        iam::logical_id_prefix(label)
    ));
    let profile_name = pending.allocate_name(
        ResourceKind::IamInstanceProfile,
        &iam::derive_instance_profile_name(label),
    );
    pending.declare(Declaration::InstanceProfile(InstanceProfileDeclaration {
        id: id.clone(),
        profile_name,
        role,
        tags: Vec::new(),
    }));
    id
}

fn resolve_image(
    pending: &mut PendingDeclarations<'_>,
    image: Supply<ImageId, ImageQuery>,
) -> ResolveResult<(ImageId, Supply<(), ImageQuery>)> {
    match image {
        Supply::Provided(image) => Ok((image, Supply::Provided(()))),
        Supply::ToSynthesize(query) => {
            let image = pending.lookup_image(&query)?;
            Ok((image, Supply::ToSynthesize(query)))
        }
    }
}

fn apply_tags(
    pending: &mut PendingDeclarations<'_>,
    label: &str,
    identity: &IdentityResolution,
    profile: &DeclarationId,
) {
    if let IdentityResolution::Declared { id, .. } = identity {
        pending.apply_tags(id, tags::role_tags(label));
    }
    pending.apply_tags(profile, tags::instance_profile_tags(label));
}

fn committed_role(stack: &Stack, id: &DeclarationId) -> Option<RoleDeclaration> {
    match stack.get(id)? {
        Declaration::Role(role) => Some(role.clone()),
        Declaration::InstanceProfile(_) => None,
    }
}

fn committed_profile(stack: &Stack, id: &DeclarationId) -> Option<InstanceProfileDeclaration> {
    match stack.get(id)? {
        Declaration::InstanceProfile(profile) => Some(profile.clone()),
        Declaration::Role(_) => None,
    }
}

/// Resolve a job runner into `stack`.
///
/// Fails with [`ResolveError::MissingCredential`] when the token is absent
/// or blank, [`ResolveError::InvalidReference`] or
/// [`ResolveError::InvalidConfiguration`] for malformed input, and
/// [`ResolveError::LookupAmbiguity`] when no single latest image exists.
/// On error the stack is left unchanged.
pub fn resolve(
    stack: &mut Stack,
    policy: &DefaultPolicy,
    config: RunnerConfiguration,
) -> ResolveResult<ResolvedJobRunner> {
    let plan = Plan::new(policy, config)?;
    let Plan {
        label,
        auth_token,
        service_url,
        compute_shape,
        concurrency_limit,
        log_byte_limit,
        environment_overrides,
        container_runtime_config,
        machine_provisioner_config,
        autoscaling_rules,
        identity,
        image,
    } = plan;

    let mut pending = stack.begin();
    let identity = resolve_identity(&mut pending, &label, identity);
    let profile_id = bind_identity(&mut pending, &label, &identity);
    let (image, image_source) = resolve_image(&mut pending, image)?;
    apply_tags(&mut pending, &label, &identity, &profile_id);
    pending.commit();

    let identity = match identity {
        IdentityResolution::Provided(role) => ResolvedIdentity::Provided(role),
        IdentityResolution::Declared { id, .. } => ResolvedIdentity::Declared(
            committed_role(stack, &id).ok_or_else(|| {
                ResolveError::InvalidStack(format!("declared role {id} missing after commit"))
            })?,
        ),
    };
    let identity_profile = committed_profile(stack, &profile_id).ok_or_else(|| {
        ResolveError::InvalidStack(format!(
            "declared instance profile {profile_id} missing after commit"
        ))
    })?;

    info!(
        stack = %stack.id(),
        region = %stack.region(),
        label = %label,
        instance_type = %compute_shape,
        image = %image,
        role = %identity.role_name(),
        role_provided = identity.is_provided(),
        instance_profile = %identity_profile.profile_name,
        "Resolved job runner"
    );

    Ok(ResolvedJobRunner {
        stack: stack.id().clone(),
        region: stack.region().to_string(),
        label,
        auth_token,
        service_url,
        compute_shape,
        concurrency_limit,
        log_byte_limit,
        environment_overrides,
        container_runtime_config,
        machine_provisioner_config,
        autoscaling_rules,
        image,
        image_source,
        identity,
        identity_profile,
    })
}
