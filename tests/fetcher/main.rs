mod gemini_backend;
