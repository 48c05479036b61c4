//! Building gate inputs from the site directory and the partition being
//! accessed.

use edms_gate::{AccessRequest, Actor, Operation, Participation};
use edms_model::{Thing, ThingView};
use edms_types::{ClassKind, Iid};

use crate::error::{ServiceError, ServiceResult};

/// Resolve `person` against the site directory.
///
/// `model` selects the engineering model whose participation is loaded;
/// `None` for site directory access.
pub fn resolve_actor(
    site_directory: &dyn ThingView,
    person: &Iid,
    model: Option<&Iid>,
) -> ServiceResult<Actor> {
    let record = match site_directory.get(person) {
        Some(Thing::Person(p)) if p.is_active => p,
        _ => {
            return Err(ServiceError::Unauthenticated(format!(
                "no active person {person}"
            )))
        }
    };
    let mut actor = Actor::new(*person);
    actor.is_site_admin = record.is_site_admin;

    if let Some(model) = model {
        let setup = model_setup(site_directory, model)
            .ok_or_else(|| ServiceError::NotFound(format!("setup of model {model}")))?;
        actor.participation = setup.participant.iter().find_map(|id| match site_directory.get(id) {
            Some(Thing::Participant(p)) if p.person == *person && p.is_active => Some(Participation {
                domains: p.domain.clone(),
                permissions: p.permission.clone(),
            }),
            _ => None,
        });
    }
    Ok(actor)
}

/// The EngineeringModelSetup describing `model`.
pub fn model_setup<'v>(
    site_directory: &'v dyn ThingView,
    model: &Iid,
) -> Option<&'v edms_model::EngineeringModelSetup> {
    site_directory
        .of_kind(ClassKind::EngineeringModelSetup)
        .into_iter()
        .find_map(|id| match site_directory.get(&id) {
            Some(Thing::EngineeringModelSetup(s)) if s.engineering_model_iid == *model => Some(s),
            _ => None,
        })
}

/// Whether the iteration enclosing `iid` has been frozen.
pub fn is_frozen(site_directory: &dyn ThingView, view: &dyn ThingView, iid: &Iid) -> bool {
    let Some(iteration) = view.iteration_of(iid) else {
        return false;
    };
    let Some(Thing::Iteration(it)) = view.get(&iteration) else {
        return false;
    };
    matches!(
        site_directory.get(&it.iteration_setup),
        Some(Thing::IterationSetup(setup)) if setup.is_frozen()
    )
}

/// Describe an operation on the existing Thing `iid`.
pub fn request_for(
    site_directory: &dyn ThingView,
    view: &dyn ThingView,
    operation: Operation,
    iid: &Iid,
) -> ServiceResult<AccessRequest> {
    let thing = view
        .get(iid)
        .ok_or_else(|| ServiceError::NotFound(iid.to_string()))?;
    Ok(AccessRequest::new(operation, thing.class_kind(), *iid)
        .owned_by(view.owner_of(iid))
        .hidden(thing.is_hidden())
        .locked_by(thing.locked_by())
        .frozen(is_frozen(site_directory, view, iid)))
}

/// Describe the creation of `thing` under `container`. Ownership falls
/// back to the container chain; the container's lock applies.
pub fn request_for_create(
    site_directory: &dyn ThingView,
    view: &dyn ThingView,
    container: &Iid,
    thing: &Thing,
) -> ServiceResult<AccessRequest> {
    let parent = view
        .get(container)
        .ok_or_else(|| ServiceError::NotFound(format!("container {container}")))?;
    Ok(AccessRequest::new(Operation::Create, thing.class_kind(), thing.iid())
        .owned_by(thing.owner().or_else(|| view.owner_of(container)))
        .locked_by(parent.locked_by())
        .frozen(is_frozen(site_directory, view, container)))
}
