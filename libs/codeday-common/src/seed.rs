use crate::types::Challenge;

/// Reference challenge set, inserted on first start if absent
pub fn default_challenges() -> Vec<Challenge> {
    vec![
        Challenge::new(1, "Sum of two numbers", "Read two numbers and print their sum.", "2 3", "5"),
        Challenge::new(2, "Multiplication", "Read two numbers and print their product.", "4 5", "20"),
        Challenge::new(3, "Parity check", "Print whether the number is even.", "7", "false"),
        Challenge::new(4, "Factorial", "Print the factorial of the number.", "5", "120"),
        Challenge::new(5, "Fibonacci numbers", "Print the n-th Fibonacci number.", "6", "8"),
        Challenge::new(6, "Reverse a string", "Print the string reversed.", "hello", "olleh"),
        Challenge::new(7, "Palindrome", "Print whether the string is a palindrome.", "madam", "true"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_days_unique_and_ordered() {
        let challenges = default_challenges();
        let days: Vec<u32> = challenges.iter().map(|c| c.day).collect();
        assert_eq!(days, vec![1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(days.iter().collect::<HashSet<_>>().len(), days.len());
    }

    #[test]
    fn test_none_completed() {
        assert!(default_challenges().iter().all(|c| !c.completed && c.user_name.is_none()));
    }
}
