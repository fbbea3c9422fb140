use std::collections::HashSet;

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::chat::prompt::{answer_prompt, render_context, render_history, sanitize_question};
use crate::chat::rewrite::{rewrite_query, RewriteOutcome};
use crate::chat::session::{ChatOptions, ChatSession};
use crate::cortex::{
    CompletionBackend, CortexError, RetrievalBackend, RetrievedDocument, SearchFilter,
    SearchRequest, ServiceDescriptor,
};

#[derive(Debug, Error)]
pub enum TurnError {
    #[error("no search services available")]
    NoServices,
    #[error("search service '{0}' is no longer available")]
    UnknownService(String),
    #[error("completion failed: {0}")]
    Completion(#[from] CortexError),
}

/// Source document behind an answer. Deduplicated by path, first
/// occurrence wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reference {
    pub relative_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TurnDebug {
    pub retrieval_query: String,
    pub rewritten: bool,
    pub service: String,
    pub model: String,
    pub num_documents: usize,
    pub context: String,
    pub prompt: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TurnOutcome {
    pub answer: String,
    pub references: Vec<Reference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<TurnDebug>,
}

/// Everything a turn needs beyond the backends: the session, the question,
/// and a snapshot of shared settings taken by the caller.
pub struct TurnRequest<'a> {
    pub session: &'a ChatSession,
    pub question: &'a str,
    pub services: &'a [ServiceDescriptor],
    pub system_prompt: &'a str,
    pub filter: Option<SearchFilter>,
}

/// Runs one blocking question-to-answer turn.
///
/// The session's turn gate is held for the whole call, so concurrent turns
/// on one session queue rather than interleave. Rewrite and retrieval
/// failures degrade (raw question, empty context); only a completion
/// failure aborts the turn, leaving the user message in the transcript
/// with no assistant reply.
pub async fn run_turn(
    completion: &dyn CompletionBackend,
    retrieval: &dyn RetrievalBackend,
    request: TurnRequest<'_>,
) -> Result<TurnOutcome, TurnError> {
    let _turn = request.session.turn_gate.lock().await;

    let options = request.session.options_snapshot();
    let descriptor = resolve_service(request.services, &options)?;

    info!(
        "Chat turn on session {} via {} ({})",
        request.session.id, descriptor.name, options.model
    );

    request
        .session
        .with_transcript(|transcript| transcript.push_user(request.question));

    let window = if options.use_chat_history {
        request.session.with_transcript(|transcript| {
            transcript.window_before_latest(options.num_chat_messages as usize)
        })
    } else {
        Vec::new()
    };

    let question = sanitize_question(request.question);
    let rewrite = if options.use_chat_history {
        rewrite_query(completion, &options.model, &window, &question).await
    } else {
        RewriteOutcome {
            query: question.clone(),
            rewritten: false,
        }
    };

    let search = SearchRequest {
        service: descriptor.name.clone(),
        query: rewrite.query.clone(),
        columns: vec![
            descriptor.search_column.clone(),
            "file_url".to_string(),
            "relative_path".to_string(),
        ],
        filter: request.filter.clone(),
        limit: options.num_retrieved_chunks,
    };
    let documents = match retrieval.search(&search).await {
        Ok(documents) => documents,
        Err(err) => {
            warn!(
                "Retrieval on {} failed, answering without context: {}",
                descriptor.name, err
            );
            Vec::new()
        }
    };

    let context = render_context(&documents, &descriptor.search_column);
    let history = render_history(&window);
    let prompt = answer_prompt(request.system_prompt, &history, &context, &question);

    let answer = completion.complete(&options.model, &prompt).await?;

    request
        .session
        .with_transcript(|transcript| transcript.push_assistant(&answer));

    let references = collect_references(&documents);
    let debug = options.debug.then(|| TurnDebug {
        retrieval_query: rewrite.query,
        rewritten: rewrite.rewritten,
        service: descriptor.name.clone(),
        model: options.model.clone(),
        num_documents: documents.len(),
        context,
        prompt,
    });

    Ok(TurnOutcome {
        answer,
        references,
        debug,
    })
}

fn resolve_service(
    services: &[ServiceDescriptor],
    options: &ChatOptions,
) -> Result<ServiceDescriptor, TurnError> {
    if services.is_empty() {
        return Err(TurnError::NoServices);
    }
    match &options.service {
        Some(name) => services
            .iter()
            .find(|descriptor| &descriptor.name == name)
            .cloned()
            .ok_or_else(|| TurnError::UnknownService(name.clone())),
        None => Ok(services[0].clone()),
    }
}

fn collect_references(documents: &[RetrievedDocument]) -> Vec<Reference> {
    let mut seen = HashSet::new();
    let mut references = Vec::new();
    for document in documents {
        let Some(path) = document.relative_path() else {
            continue;
        };
        if seen.insert(path.to_string()) {
            references.push(Reference {
                relative_path: path.to_string(),
                file_url: document.file_url().map(str::to_string),
            });
        }
    }
    references
}
