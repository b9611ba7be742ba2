use actix_web::HttpResponse;
use scmhook::Event;

use crate::http::Webhook;

pub async fn receive(Webhook(event): Webhook) -> HttpResponse {
    let event = match event {
        Some(event) => event,
        None => return HttpResponse::Accepted().finish(),
    };

    let repo = event.repository();
    match &event {
        Event::Push(push) => tracing::info!(
            repo.namespace = repo.namespace.as_str(),
            repo.name = repo.name.as_str(),
            "Push to {} ({} -> {})",
            push.reference,
            push.before,
            push.after,
        ),
        Event::Branch(change) | Event::Tag(change) => tracing::info!(
            repo.namespace = repo.namespace.as_str(),
            repo.name = repo.name.as_str(),
            "{} {} {:?} at {}",
            event.kind(),
            change.reference.name,
            change.action,
            change.reference.sha,
        ),
        Event::PullRequest(change) => tracing::info!(
            repo.namespace = repo.namespace.as_str(),
            repo.name = repo.name.as_str(),
            "Pull request #{} {:?}: {}",
            change.pull_request.number,
            change.action,
            change.pull_request.title,
        ),
        Event::Unrecognized(unrecognized) => tracing::info!(
            repo.namespace = repo.namespace.as_str(),
            repo.name = repo.name.as_str(),
            "Received `{}` event",
            unrecognized.event,
        ),
    }

    HttpResponse::Ok().json(&event)
}
