//! Model-facing prompt templates. The knowledge base is a Japanese product
//! manual, so prompts are Japanese as well.

pub fn stuffing(knowledge: &str, question: &str) -> String {
    format!(
        "以下の製品取扱説明書を参考にして、質問に答えてください。\n\n\
         === 製品取扱説明書 ===\n{knowledge}\n\n\
         === 質問 ===\n{question}\n\n\
         === 回答 ===\n製品取扱説明書の内容に基づいて、正確な情報を提供してください。"
    )
}

pub fn retrieval(context: &str, question: &str) -> String {
    format!(
        "以下の製品取扱説明書を参考にして、質問に答えてください。\n\n\
         === 製品取扱説明書（関連情報） ===\n{context}\n\n\
         === 質問 ===\n{question}\n\n\
         === 回答 ===\n製品取扱説明書の内容に基づいて、正確な情報を提供してください。"
    )
}

pub fn tool_answer(question: &str, tool_result: &str) -> String {
    format!(
        "以下のツール実行結果を基に、ユーザーの質問に答えてください。\n\n\
         質問: {question}\n\nツール実行結果:\n{tool_result}\n\n回答:"
    )
}

pub fn agent_system(product: &str) -> String {
    format!(
        "あなたは製品「{product}」の技術サポート担当者です。\
         利用可能なツールを使用して、ユーザーの質問に正確で有用な回答を提供してください。\
         必要に応じて複数のツールを組み合わせて使用することができます。"
    )
}

pub fn not_found(query: &str) -> String {
    format!("'{query}'に関する情報は見つかりませんでした。")
}

pub fn search_results(joined: &str) -> String {
    format!("検索結果:\n{joined}")
}

pub fn unknown_tool(name: &str) -> String {
    format!("ツール '{name}' は利用できないため、回答を生成できませんでした。")
}
