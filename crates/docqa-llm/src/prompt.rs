//! Prompt construction.

/// Build the question-answering prompt from retrieved fragments.
///
/// Fragments are joined with single newlines in the order given, which is
/// nearest-first when they come from the retrieval store.
pub fn build_prompt<S: AsRef<str>>(fragments: &[S], question: &str) -> String {
    let context = fragments
        .iter()
        .map(|f| f.as_ref())
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Answer using the context only.\n\
         If not found, say \"I don't know\".\n\
         \n\
         Context:\n\
         {context}\n\
         \n\
         Question:\n\
         {question}\n\
         \n\
         Answer:\n"
    )
}
