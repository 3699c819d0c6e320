//! 内置默认模板
//!
//! 键名即配置中 [prompts.overrides] 与 prompts 目录下 `<key>.md` 的文件名。

pub const REACT_SYSTEM: &str = "react_system";
pub const REACT_USER: &str = "react_user";
pub const PLANNER: &str = "planner";
pub const EXECUTOR: &str = "executor";
pub const INITIAL: &str = "initial";
pub const REFLECT: &str = "reflect";
pub const REFINE: &str = "refine";

/// 全部内置模板键
pub const ALL_KEYS: [&str; 7] = [
    REACT_SYSTEM,
    REACT_USER,
    PLANNER,
    EXECUTOR,
    INITIAL,
    REFLECT,
    REFINE,
];

const REACT_SYSTEM_TEXT: &str = r#"You are an assistant that can call external tools.

Available tools:
{tools}

Reply strictly in this format:

Thought: your reasoning, used to analyse the problem and plan the next step.
Action: the action you take, exactly one of:
- `{{tool_name}}[{{tool_input}}]` or `{{tool_name}}(arg="value")`: call one available tool.
- `Finish[final answer]`: when you have enough information to answer.

Output exactly one Thought and one Action per reply. When you can answer the user's
question, you must use `Action: Finish[final answer]`."#;

const REACT_USER_TEXT: &str = r#"Solve the following problem:
Question: {question}
History:
{history}"#;

const PLANNER_TEXT: &str = r#"You are a planning expert. Break the user's question into a plan of simple steps.
Each step must be an independent, executable sub-task, listed in logical order.
Your output must be a Python list where every element is a string describing one sub-task.

Question: {question}

Output the plan strictly in this format; the ```python and ``` fences are required:
```python
["step 1", "step 2", "step 3", ...]
```"#;

const EXECUTOR_TEXT: &str = r#"You are an execution expert. Solve the problem by following the given plan step by step.
You receive the original question, the full plan, and the steps completed so far with their results.
Focus on the current step only and output only its answer, without extra explanation.

# Original question:
{question}

# Full plan:
{plan}

# Previous steps and results:
{history}

# Current step:
{current_step}

Answer the current step only:"#;

const INITIAL_TEXT: &str = r#"Complete the following task:

Task: {task}

Provide a complete and accurate answer."#;

const REFLECT_TEXT: &str = r#"Review the following answer carefully and find problems or room for improvement:

# Original task:
{task}

# Current answer:
{content}

Analyse the quality of this answer, point out its weaknesses and give concrete suggestions.
If the answer is already good, reply "no improvement needed"."#;

const REFINE_TEXT: &str = r#"Improve your answer according to the feedback:

# Original task:
{task}

# Previous answer:
{last_attempt}

# Feedback:
{feedback}

Provide the improved answer."#;

/// 内置模板 (key, text)
pub fn builtin() -> [(&'static str, &'static str); 7] {
    [
        (REACT_SYSTEM, REACT_SYSTEM_TEXT),
        (REACT_USER, REACT_USER_TEXT),
        (PLANNER, PLANNER_TEXT),
        (EXECUTOR, EXECUTOR_TEXT),
        (INITIAL, INITIAL_TEXT),
        (REFLECT, REFLECT_TEXT),
        (REFINE, REFINE_TEXT),
    ]
}
